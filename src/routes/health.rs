use axum::{extract::State, http::StatusCode};
use diesel_async::SimpleAsyncConnection;
use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .routes(utoipa_axum::routes!(health))
        .routes(utoipa_axum::routes!(readiness))
}

/// Liveness probe. Does not touch dependencies.
#[utoipa::path(
    get,
    path = "/health",
    tags = ["Health"],
    responses((status = 200, description = "Service is running", body = String))
)]
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe. Fails with 503 while the database is unreachable.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["Health"],
    responses(
        (status = 200, description = "Database reachable"),
        (status = 503, description = "Database unreachable")
    )
)]
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Ok(mut conn) = state.db_pool.get().await else {
        return StatusCode::SERVICE_UNAVAILABLE;
    };
    match conn.batch_execute("SELECT 1").await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
