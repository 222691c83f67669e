//! Route-layer middleware resolving the caller from the `Authorization: Bearer` header.
//!
//! Each layer inserts what it resolved into the request extensions so handlers can
//! take `Extension<Identity>` or `Extension<CustomerEntity>`.

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use diesel::{OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;

use crate::{
    api::identity::verify_token,
    app_error::AppError,
    app_state::AppState,
    domain::session::Identity,
    models::CustomerEntity,
    schema::customers,
};

/// Extract the bearer token, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the request's token, if it carries one.
pub async fn authenticate(state: &AppState, token: Option<&str>) -> Result<Option<Identity>, AppError> {
    match token {
        Some(token) => {
            verify_token(
                &state.http_client,
                &state.config.auth.identity_service_url,
                token,
            )
            .await
        }
        None => Ok(None),
    }
}

async fn require_identity(state: &AppState, token: Option<String>) -> Result<Identity, AppError> {
    authenticate(state, token.as_deref())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid bearer token".into()))
}

/// Any signed-in identity.
pub async fn identity_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let identity = require_identity(&state, token).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// A signed-in identity with a customer profile.
pub async fn customers_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let identity = require_identity(&state, token).await?;

    let customer: Option<CustomerEntity> = {
        let conn = &mut state
            .db_pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;
        customers::table
            .find(&identity.uid)
            .get_result(conn)
            .await
            .optional()
            .context("Failed to look up customer")?
    };

    let customer = customer.ok_or_else(|| AppError::Unauthorized("Not a customer".into()))?;

    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(customer);
    Ok(next.run(req).await)
}

/// A signed-in identity listed in `ADMIN_UIDS`.
pub async fn admins_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let identity = require_identity(&state, token).await?;

    if !state.config.auth.is_admin(&identity.uid) {
        tracing::warn!(uid = %identity.uid, "Non-admin identity on admin route");
        return Err(AppError::ForbiddenResource("Admin access required".into()));
    }

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
