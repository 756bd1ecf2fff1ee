//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// Default port for the HTTP listener.
pub const DEFAULT_PORT: u16 = 3000;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "keyway_session";

/// Default mount point of the editor routes.
pub const DEFAULT_ROUTE_PREFIX: &str = "/vscode";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Mark the session cookie `Secure` (HTTPS only).
    pub cookie_secure: bool,

    /// Enable request logging.
    pub request_logging: bool,

    /// Path the editor routes are nested under.
    pub route_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_secure: false,
            request_logging: true,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the `Secure` attribute on the session cookie.
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Mount the editor routes under another path, e.g. `/api/vscode`.
    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = prefix.into();
        self
    }
}
