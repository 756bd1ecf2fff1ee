//! Error types for the sign-in handshake.
//!
//! Each variant maps to one wire-level error kind. Infrastructure failures
//! carry their cause for server-side logging; the client only ever sees the
//! generic description.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors surfaced by the authorize, callback and user-info operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Request was missing a parameter or could not be parsed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Presented state does not match the pending state in the session.
    #[error("Invalid state parameter")]
    InvalidState,

    /// Upstream code exchange failed.
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// Session, storage or signing failure.
    #[error("{description}: {cause}")]
    Server {
        description: &'static str,
        cause: String,
    },

    /// The user may not sign in.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// No bearer credential was presented.
    #[error("Missing access token")]
    Unauthorized,

    /// Bearer credential failed validation.
    #[error("Invalid access token")]
    InvalidToken,

    /// Token is valid but its user is gone.
    #[error("User does not exist")]
    UserNotFound,
}

impl AuthError {
    /// Build a server error with a client-safe description and a private cause.
    pub fn server(description: &'static str, cause: impl std::fmt::Display) -> Self {
        AuthError::Server {
            description,
            cause: cause.to_string(),
        }
    }

    /// Wire-level error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::InvalidState => "invalid_state",
            AuthError::InvalidGrant(_) => "invalid_grant",
            AuthError::Server { .. } => "server_error",
            AuthError::AccessDenied(_) => "access_denied",
            AuthError::Unauthorized => "unauthorized",
            AuthError::InvalidToken => "invalid_token",
            AuthError::UserNotFound => "user_not_found",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidRequest(_) | AuthError::InvalidState | AuthError::InvalidGrant(_) => {
                400
            }
            AuthError::Server { .. } => 500,
            AuthError::AccessDenied(_) => 403,
            AuthError::Unauthorized | AuthError::InvalidToken => 401,
            AuthError::UserNotFound => 404,
        }
    }

    /// Human-readable description that is safe to return to the client.
    pub fn description(&self) -> String {
        match self {
            AuthError::InvalidRequest(msg)
            | AuthError::InvalidGrant(msg)
            | AuthError::AccessDenied(msg) => msg.clone(),
            AuthError::Server { description, .. } => description.to_string(),
            AuthError::InvalidState => "invalid state parameter".to_string(),
            AuthError::Unauthorized => "missing access token".to_string(),
            AuthError::InvalidToken => "invalid access token".to_string(),
            AuthError::UserNotFound => "user does not exist".to_string(),
        }
    }

    /// Whether this is an infrastructure failure rather than a client error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AuthError::Server { .. })
    }
}
