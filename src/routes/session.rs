use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use diesel::{OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::session::{Identity, ProfileLookup, Session, resolve_session},
    middleware::{authenticate, bearer_token},
    models::CustomerEntity,
    schema::customers,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_session))
}

/// Look up the profile behind an identity without ever failing.
pub async fn lookup_profile(state: &AppState, identity: &Identity) -> ProfileLookup {
    let mut conn = match state.db_pool.get().await {
        Ok(conn) => conn,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to obtain a DB connection pool");
            return ProfileLookup::Unavailable;
        }
    };

    let customer: Result<Option<CustomerEntity>, _> = customers::table
        .find(&identity.uid)
        .get_result(&mut conn)
        .await
        .optional();

    match customer {
        Ok(Some(customer)) => ProfileLookup::Found(customer.into()),
        Ok(None) => ProfileLookup::Missing,
        Err(err) => ProfileLookup::Failed(err.to_string()),
    }
}

/// Resolve who the caller is. Never fails: problems degrade to an anonymous session.
#[utoipa::path(
    get,
    path = "/session",
    tags = ["Session"],
    security((), ("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current session", body = StdResponse<Session, String>)
    )
)]
async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let identity = match authenticate(&state, bearer_token(&headers)).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "Token verification failed, treating caller as anonymous");
            None
        }
    };

    let session = match &identity {
        Some(identity) => resolve_session(Some(identity), lookup_profile(&state, identity).await),
        None => Session::Anonymous,
    };

    Ok(StdResponse {
        data: Some(session),
        message: Some("Get session successfully"),
    })
}
