use anyhow::Context;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::ServiceEntity,
    schema::tailoring_services,
};

/// Tailoring services open for orders.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/services",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_services))
            .routes(utoipa_axum::routes!(get_service)),
    )
}

/// List active tailoring services.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Services"],
    responses(
        (status = 200, description = "List services", body = StdResponse<Vec<ServiceEntity>, String>)
    )
)]
async fn get_services(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let services: Vec<ServiceEntity> = tailoring_services::table
        .filter(tailoring_services::active.eq(true))
        .order_by(tailoring_services::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get services")?;

    Ok(StdResponse {
        data: Some(services),
        message: Some("Get services successfully"),
    })
}

/// Fetch one active service.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Services"],
    params(
        ("id" = Uuid, Path, description = "Service ID to fetch")
    ),
    responses(
        (status = 200, description = "Get service successfully", body = StdResponse<ServiceEntity, String>),
        (status = 404, description = "Service not found or inactive")
    )
)]
async fn get_service(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let service: ServiceEntity = tailoring_services::table
        .find(id)
        .filter(tailoring_services::active.eq(true))
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(service),
        message: Some("Get service successfully"),
    })
}
