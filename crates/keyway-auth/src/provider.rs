//! Upstream identity provider exchange.
//!
//! The handshake only needs two things from the provider: where to send the
//! user to authorize, and a way to turn the returned code into a profile.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Profile returned by a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamProfile {
    /// Stable external identifier (GitHub login).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email, if the provider shared one.
    pub email: Option<String>,
}

/// Errors from the upstream exchange. The message is passed through to the
/// client as the `invalid_grant` description.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Code was empty.
    #[error("invalid authorization code")]
    InvalidCode,

    /// Network/HTTP error.
    #[error("unable to reach identity provider: {0}")]
    Network(String),

    /// Provider rejected the exchange.
    #[error("{0}")]
    Upstream(String),

    /// Provider answered with an unusable profile.
    #[error("identity provider returned an empty user profile, please retry later")]
    EmptyProfile,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Network(e.to_string())
    }
}

/// Upstream identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Build the URL the user should be sent to.
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange an authorization code for the user's profile.
    async fn exchange_code(&self, code: &str) -> Result<UpstreamProfile, ProviderError>;
}

// ============================================================================
// GitHub
// ============================================================================

/// Default request timeout for GitHub calls.
const GITHUB_TIMEOUT: Duration = Duration::from_secs(5);

/// User agent sent to the GitHub API, which rejects anonymous clients.
const USER_AGENT: &str = concat!("keyway/", env!("CARGO_PKG_VERSION"));

/// GitHub OAuth app configuration.
#[derive(Clone)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub user_url: String,
    pub scope: String,
}

impl GitHubConfig {
    /// Config pointing at github.com.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            user_url: "https://api.github.com/user".to_string(),
            scope: "user:email".to_string(),
        }
    }

    /// Point every endpoint at another base URL (GitHub Enterprise, test servers).
    pub fn with_base_urls(mut self, web_base: &str, api_base: &str) -> Self {
        let web_base = web_base.trim_end_matches('/');
        let api_base = api_base.trim_end_matches('/');
        self.authorize_url = format!("{}/login/oauth/authorize", web_base);
        self.token_url = format!("{}/login/oauth/access_token", web_base);
        self.user_url = format!("{}/user", api_base);
        self
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("user_url", &self.user_url)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AccessTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// GitHub answers token requests with 200 even on failure, so both shapes
/// share one struct.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    #[serde(default)]
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// GitHub OAuth client.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    config: GitHubConfig,
    client: reqwest::Client,
}

impl GitHubProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(config: GitHubConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(GITHUB_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { config, client })
    }

    /// Provider configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .json(&AccessTokenRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                code,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Upstream(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("failed to parse token response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(ProviderError::Upstream(
                body.error_description.unwrap_or(error),
            ));
        }

        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::Upstream("token response had no access_token".to_string()))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser, ProviderError> {
        let response = self
            .client
            .get(&self.config.user_url)
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("user request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Upstream(format!(
                "user lookup failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("failed to parse user response: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&state={}&scope={}",
            self.config.authorize_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
            self.config.scope,
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<UpstreamProfile, ProviderError> {
        if code.is_empty() {
            return Err(ProviderError::InvalidCode);
        }

        let access_token = self.fetch_access_token(code).await?;
        let user = self.fetch_user(&access_token).await?;

        if user.login.is_empty() {
            return Err(ProviderError::EmptyProfile);
        }

        debug!(login = %user.login, "GitHub code exchanged");

        Ok(UpstreamProfile {
            name: user.name.filter(|n| !n.is_empty()).unwrap_or_else(|| user.login.clone()),
            id: user.login,
            email: user.email.filter(|e| !e.is_empty()),
        })
    }
}
