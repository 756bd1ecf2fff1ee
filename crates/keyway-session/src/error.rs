//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session id was not issued by this store.
    #[error("Invalid session id: {0}")]
    InvalidId(String),

    /// Store has no room for sessions.
    #[error("Session store has zero capacity")]
    NoCapacity,
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
