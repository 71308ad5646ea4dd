//! Error handling module
//!
//! Translates the core error taxonomy into HTTP responses. Every error body
//! carries a machine-readable code, a human message, and the caller's
//! interaction identifier for correlation. Internal details never leak.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::CoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// A core error decorated with the request's interaction identifier.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct AppError {
    pub kind: CoreError,
    pub interaction_id: Option<Uuid>,
}

impl AppError {
    pub fn new(kind: CoreError) -> Self {
        Self {
            kind,
            interaction_id: None,
        }
    }

    pub fn with_interaction_id(mut self, interaction_id: Uuid) -> Self {
        self.interaction_id = Some(interaction_id);
        self
    }
}

impl From<CoreError> for AppError {
    fn from(kind: CoreError) -> Self {
        Self::new(kind)
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<Uuid>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.kind {
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::IdempotencyConflict => StatusCode::CONFLICT,
            CoreError::KeyInProgress => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::BusinessRuleViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::ComplianceViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::DecryptionFailed(_) => StatusCode::BAD_REQUEST,
            CoreError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.kind {
            CoreError::Internal(detail) => {
                tracing::error!(
                    detail = %detail,
                    interaction_id = ?self.interaction_id,
                    "Internal error"
                );
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: self.kind.code().to_string(),
            message,
            interaction_id: self.interaction_id,
        };

        (status, Json(body)).into_response()
    }
}
