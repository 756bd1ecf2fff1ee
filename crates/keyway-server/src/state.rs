//! Application state shared across handlers.

use std::sync::Arc;

use keyway_auth::{
    AuthorizationInitiator, CallbackHandler, IdentityProvider, IdentityResolver, TokenConfig,
    TokenIssuer, TokenValidator, UserStore,
};
use keyway_session::SessionStore;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Sign-in sessions keyed by cookie.
    pub sessions: SessionStore,

    pub initiator: Arc<AuthorizationInitiator>,
    pub callback: Arc<CallbackHandler>,
    pub resolver: Arc<IdentityResolver>,
}

impl AppState {
    /// Wire the handshake components around one provider, user store and
    /// token configuration.
    pub fn new(
        config: ServerConfig,
        sessions: SessionStore,
        provider: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
        tokens: &TokenConfig,
    ) -> Self {
        let initiator = AuthorizationInitiator::new(Arc::clone(&provider));
        let callback = CallbackHandler::new(provider, Arc::clone(&users), TokenIssuer::new(tokens));
        let resolver = IdentityResolver::new(TokenValidator::new(tokens), users);

        Self {
            config: Arc::new(config),
            sessions,
            initiator: Arc::new(initiator),
            callback: Arc::new(callback),
            resolver: Arc::new(resolver),
        }
    }

    /// Refuse tokens of users that are no longer enabled.
    pub fn with_status_enforcement(mut self, enabled: bool) -> Self {
        let resolver = (*self.resolver).clone().with_status_enforcement(enabled);
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
