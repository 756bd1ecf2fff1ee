//! Anti-forgery state and the session capability it is bound to.

use async_trait::async_trait;
use rand::{Rng, distr::Alphanumeric};
use subtle::ConstantTimeEq;

/// Session key holding the pending authorization state.
pub const PENDING_STATE_KEY: &str = "vscode_oauth_state";

/// Length of a generated state string.
pub const STATE_LENGTH: usize = 12;

/// Failure to persist a session.
#[derive(Debug, thiserror::Error)]
#[error("Session error: {0}")]
pub struct SessionError(pub String);

/// Mutable view of the caller's server-side session.
///
/// The hosting layer owns loading and cookie handling; the handshake only
/// needs to read, write and persist string values.
#[async_trait]
pub trait SessionHandle: Send {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: String);

    /// Remove a value, returning what was stored.
    fn remove(&mut self, key: &str) -> Option<String>;

    /// Persist pending changes.
    async fn save(&mut self) -> std::result::Result<(), SessionError>;
}

/// Generate a fresh state string from the thread-local CSPRNG.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// Exact comparison of a presented state against the stored one.
pub(crate) fn states_match(presented: &str, stored: &str) -> bool {
    presented.len() == stored.len() && bool::from(presented.as_bytes().ct_eq(stored.as_bytes()))
}
