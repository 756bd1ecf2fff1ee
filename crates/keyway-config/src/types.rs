//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]      # listener
//! [session]     # sign-in session cookie and store
//! [token]       # scoped token signing
//! [github]      # OAuth application
//! [database]    # user store
//! [auth]        # policy switches
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::secrets::{self, GITHUB_SECRET_ENV, ResolvedSecret, TOKEN_SECRET_ENV};
use crate::{ConfigError, Result};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default mount point of the editor routes.
pub const DEFAULT_ROUTE_PREFIX: &str = "/vscode";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywayConfig {
    pub server: Option<ServerConfig>,
    pub session: Option<SessionConfig>,
    pub token: Option<TokenSection>,
    pub github: Option<GitHubSection>,
    pub database: Option<DatabaseConfig>,
    pub auth: Option<AuthPolicy>,
}

impl KeywayConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: KeywayConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.github.is_some() {
            self.github = other.github;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    pub fn token(&self) -> TokenSection {
        self.token.clone().unwrap_or_default()
    }

    pub fn github(&self) -> GitHubSection {
        self.github.clone().unwrap_or_default()
    }

    pub fn auth(&self) -> AuthPolicy {
        self.auth.clone().unwrap_or_default()
    }

    /// Path of the user database, if one is configured.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.as_ref().and_then(|db| db.path.clone())
    }

    /// Resolve the token signing secret (env var, then config file).
    pub fn token_secret(&self) -> Result<ResolvedSecret> {
        let token = self.token();
        secrets::resolve_secret(TOKEN_SECRET_ENV, token.secret.as_deref())
            .ok_or_else(|| ConfigError::missing("secret", "[token]"))
    }

    /// Resolve the GitHub client secret (env var, then config file).
    pub fn github_client_secret(&self) -> Result<ResolvedSecret> {
        let github = self.github();
        secrets::resolve_secret(GITHUB_SECRET_ENV, github.client_secret.as_deref())
            .ok_or_else(|| ConfigError::missing("client_secret", "[github]"))
    }

    /// Check values that would make the service unusable.
    ///
    /// Secrets are checked only when written in the file; absence is
    /// reported when they are resolved.
    pub fn validate(&self) -> Result<()> {
        let token = self.token();
        if token.secret.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::invalid("token.secret", "must not be empty"));
        }
        if token.validity_days == 0 {
            return Err(ConfigError::invalid(
                "token.validity_days",
                "must be at least 1",
            ));
        }

        let prefix = self.server().route_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(ConfigError::invalid(
                "server.route_prefix",
                "must start with '/' and not end with '/'",
            ));
        }

        let session = self.session();
        if session.max_sessions == 0 {
            return Err(ConfigError::invalid(
                "session.max_sessions",
                "must be at least 1",
            ));
        }
        if session.cookie_name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "session.cookie_name",
                "must not be empty",
            ));
        }

        if let Some(github) = &self.github
            && github.client_id.is_empty()
        {
            return Err(ConfigError::invalid("github.client_id", "must not be empty"));
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable request logging.
    pub request_logging: bool,
    /// Path the editor routes are mounted under, e.g. `/api/vscode`.
    pub route_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            request_logging: true,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Sign-in session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Set the `Secure` attribute on the cookie.
    pub cookie_secure: bool,
    /// Idle lifetime of a session in seconds.
    pub ttl_secs: u64,
    /// Maximum number of live sessions.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "keyway_session".to_string(),
            cookie_secure: false,
            ttl_secs: 600,
            max_sessions: 10_000,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────────────

/// Scoped token settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSection {
    /// Signing secret. Prefer `KEYWAY_TOKEN_SECRET`.
    pub secret: Option<String>,
    /// Token lifetime in days.
    pub validity_days: u64,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            secret: None,
            validity_days: 30,
        }
    }
}

impl TokenSection {
    pub fn validity(&self) -> Duration {
        Duration::from_secs(self.validity_days * 24 * 60 * 60)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GitHub
// ─────────────────────────────────────────────────────────────────────────────

/// GitHub OAuth application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub client_id: String,
    /// Prefer `KEYWAY_GITHUB_CLIENT_SECRET`.
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub user_url: String,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            user_url: "https://api.github.com/user".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Database / Auth
// ─────────────────────────────────────────────────────────────────────────────

/// User store location. Without a path users live in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Authorization policy switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPolicy {
    /// Reject tokens of users that are no longer enabled.
    pub enforce_user_status: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
