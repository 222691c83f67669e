//! Catalog and order management. Every route here requires an admin identity.

use utoipa_axum::router::OpenApiRouter;

use crate::{app_error::AppError, app_state::AppState};

pub mod fabrics;
pub mod orders;
pub mod products;
pub mod services;

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    products::routes_with_openapi(state.clone())
        .merge(fabrics::routes_with_openapi(state.clone()))
        .merge(services::routes_with_openapi(state.clone()))
        .merge(orders::routes_with_openapi(state))
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

fn require_amount(field: &str, value: f64) -> Result<(), AppError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(AppError::BadRequest(format!(
            "{field} must be zero or a positive number"
        )));
    }
    Ok(())
}
