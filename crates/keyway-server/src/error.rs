//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keyway_auth::AuthError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Handshake or token error with a wire-level kind.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error kind for programmatic handling.
    pub error: String,
    /// Human-readable description.
    pub error_description: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind, description) = match &self {
            ServerError::Auth(err) => (
                StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.kind(),
                err.description(),
            ),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal server error".to_string(),
            ),
        };

        // Logged message keeps the private cause; the body never does.
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = %status, kind, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, kind, error = %message, "Client error");
        }

        let body = ErrorResponse {
            error: kind.to_string(),
            error_description: description,
        };

        (status, Json(body)).into_response()
    }
}
