//! Error types and Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error types.
///
/// Signature and time-window failures are deliberately absent: a rejected
/// login is a `{"result": false}` response, not an error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited")]
    RateLimited,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// Convenience conversions from common error types
impl From<crate::storage::nonce::StoreError> for AppError {
    fn from(err: crate::storage::nonce::StoreError) -> Self {
        match err {
            crate::storage::nonce::StoreError::Full => AppError::RateLimited,
            err => AppError::Internal(format!("Store error: {}", err)),
        }
    }
}

impl From<crate::auth::token::SigningError> for AppError {
    fn from(err: crate::auth::token::SigningError) -> Self {
        AppError::Internal(format!("Session signing error: {}", err))
    }
}

impl From<crate::auth::message::MessageError> for AppError {
    fn from(err: crate::auth::message::MessageError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}
