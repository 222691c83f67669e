//! Error type shared by every handler, plus the JSON envelope responses are wrapped in.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::Error as DieselError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::{checkout::CheckoutError, order_status::TransitionError, stock::StockError};

/// Standard response envelope: `{ "data": ..., "message": ... }`.
#[derive(Serialize, Debug, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T, M> IntoResponse for StdResponse<T, M>
where
    T: Serialize,
    M: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Resource not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    ForbiddenResource(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0} is unreachable")]
    ServiceUnreachable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            other => Self::Other(other.into()),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient { .. } => Self::Conflict(err.to_string()),
            StockError::Malformed(_) => Self::Other(err.into()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::UnknownStatus(_) => Self::BadRequest(err.to_string()),
            _ => Self::Conflict(err.to_string()),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ForbiddenResource(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the logs
        let message = match &self {
            Self::Other(err) => {
                tracing::error!(error = ?err, "Request failed");
                "Internal server error".to_string()
            }
            Self::ServiceUnreachable(service) => {
                tracing::error!(service = %service, "Upstream service unreachable");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (
            status,
            StdResponse::<(), String> {
                data: None,
                message: Some(message),
            },
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::ForbiddenResource("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ServiceUnreachable("IdentityService".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let err: AppError = DieselError::NotFound.into();
        assert!(matches!(err, AppError::NotFound));

        let err: AppError = DieselError::RollbackTransaction.into();
        assert!(matches!(err, AppError::Other(_)));
    }

    #[test]
    fn test_domain_errors_map_to_client_errors() {
        let err: AppError = StockError::Insufficient {
            label: "size M".into(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: AppError = StockError::SizeRequired.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = StockError::Overflow.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = CheckoutError::Missing("measurements").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = TransitionError::UnknownStatus("shipped".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = TransitionError::Terminal(
            crate::domain::order_status::OrderStatus::Delivered,
        )
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let err = AppError::Other(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_client_errors_carry_their_message() {
        let response = AppError::Conflict("Insufficient stock for size M".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Conflict: Insufficient stock for size M");
    }
}
