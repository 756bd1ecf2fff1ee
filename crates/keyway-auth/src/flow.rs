//! The three editor sign-in operations.
//!
//! ```text
//! editor ── GET authorize ──▶ AuthorizationInitiator ── state → session
//!    │
//!    └─ user approves at GitHub, editor receives code + state
//!
//! editor ── POST callback ──▶ CallbackHandler
//!              state check → code exchange → reconcile user → issue token
//!
//! editor ── GET user (Bearer) ──▶ IdentityResolver
//!              validate token → load user
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::provider::{IdentityProvider, UpstreamProfile};
use crate::state::{PENDING_STATE_KEY, SessionHandle, generate_state, states_match};
use crate::token::{TokenIssuer, TokenValidator};
use crate::users::{NewUser, UserRecord, UserStore};

/// Token type reported to the editor.
pub const TOKEN_TYPE: &str = "Bearer";

/// Scope reported to the editor in the callback response.
pub const GRANTED_SCOPE: &str = "user";

// ─────────────────────────────────────────────────────────────────────────────
// Authorize
// ─────────────────────────────────────────────────────────────────────────────

/// Result of starting an authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub authorization_url: String,
    pub state: String,
}

/// Starts an authorization attempt and binds its state to the session.
#[derive(Debug, Clone)]
pub struct AuthorizationInitiator {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthorizationInitiator {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Generate a state, store it in the session and build the provider URL.
    ///
    /// Any pending state already in the session is overwritten, so only the
    /// most recent attempt can complete.
    pub async fn authorize<S>(
        &self,
        redirect_uri: Option<&str>,
        session: &mut S,
    ) -> Result<AuthorizationResponse>
    where
        S: SessionHandle + ?Sized,
    {
        let redirect_uri = redirect_uri
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| AuthError::InvalidRequest("missing redirect_uri parameter".to_string()))?;

        let state = generate_state();
        session.set(PENDING_STATE_KEY, state.clone());
        session
            .save()
            .await
            .map_err(|e| AuthError::server("failed to save session", e))?;

        debug!(redirect_uri, "Authorization started");

        Ok(AuthorizationResponse {
            authorization_url: self.provider.authorization_url(redirect_uri, &state),
            state,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback
// ─────────────────────────────────────────────────────────────────────────────

/// Callback payload posted by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub code: String,
    pub state: String,
    pub redirect_uri: String,
}

impl CallbackRequest {
    /// Parse a JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| {
            debug!(error = %e, "Unparseable callback body");
            AuthError::InvalidRequest("invalid parameters".to_string())
        })
    }
}

/// Account summary returned with a token.
///
/// A missing email is sent as an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: i64,
    pub label: String,
    pub email: String,
}

/// Successful callback response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
    pub account: AccountInfo,
}

/// Completes an authorization: checks state, exchanges the code, reconciles
/// the user and issues a scoped token.
#[derive(Clone)]
pub struct CallbackHandler {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
    issuer: TokenIssuer,
}

impl CallbackHandler {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            provider,
            users,
            issuer,
        }
    }

    /// Run the callback.
    ///
    /// State is checked before anything else happens. A matched state is
    /// removed from the session so the same state cannot complete twice.
    pub async fn handle<S>(&self, request: CallbackRequest, session: &mut S) -> Result<TokenResponse>
    where
        S: SessionHandle + ?Sized,
    {
        let stored = session.get(PENDING_STATE_KEY);
        match stored {
            Some(ref stored) if states_match(&request.state, stored) => {}
            _ => {
                warn!(has_pending = stored.is_some(), "Callback state mismatch");
                return Err(AuthError::InvalidState);
            }
        }

        session.remove(PENDING_STATE_KEY);
        session
            .save()
            .await
            .map_err(|e| AuthError::server("failed to save session", e))?;

        let profile = self
            .provider
            .exchange_code(&request.code)
            .await
            .map_err(|e| AuthError::InvalidGrant(e.to_string()))?;

        let user = self.reconcile(&profile).await?;

        if !user.is_enabled() {
            warn!(user_id = user.id, status = ?user.status, "Sign-in refused for inactive user");
            return Err(AuthError::AccessDenied("user has been disabled".to_string()));
        }

        let access_token = self
            .issuer
            .issue(user.id)
            .map_err(|e| AuthError::server("failed to generate access token", e))?;

        info!(user_id = user.id, username = %user.username, "Editor token issued");

        Ok(TokenResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            scope: GRANTED_SCOPE.to_string(),
            account: AccountInfo {
                id: user.id,
                label: user.username,
                email: user.email.unwrap_or_default(),
            },
        })
    }

    /// Look up the user linked to the profile, creating one on first sign-in.
    /// Stored fields win over the incoming profile.
    async fn reconcile(&self, profile: &UpstreamProfile) -> Result<UserRecord> {
        let existing = self
            .users
            .find_by_github_id(&profile.id)
            .await
            .map_err(|e| AuthError::server("failed to process user", e))?;

        if let Some(user) = existing {
            debug!(user_id = user.id, "Linked user found");
            return Ok(user);
        }

        let user = self
            .users
            .create(NewUser {
                github_id: profile.id.clone(),
                username: profile.id.clone(),
                display_name: profile.name.clone(),
                email: profile.email.clone(),
            })
            .await
            .map_err(|e| AuthError::server("failed to process user", e))?;

        info!(user_id = user.id, username = %user.username, "User created on first sign-in");
        Ok(user)
    }
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("provider", &self.provider)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User info
// ─────────────────────────────────────────────────────────────────────────────

/// Profile returned to a token holder.
///
/// `role` is the numeric role code and a missing email is an empty string,
/// which is the shape existing editor clients parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: i64,
}

impl From<UserRecord> for UserInfo {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email.unwrap_or_default(),
            display_name: user.display_name,
            role: user.role.code(),
        }
    }
}

/// Resolves a presented bearer token to its user.
#[derive(Clone)]
pub struct IdentityResolver {
    validator: TokenValidator,
    users: Arc<dyn UserStore>,
    enforce_user_status: bool,
}

impl IdentityResolver {
    pub fn new(validator: TokenValidator, users: Arc<dyn UserStore>) -> Self {
        Self {
            validator,
            users,
            enforce_user_status: false,
        }
    }

    /// Refuse tokens whose user is no longer enabled. Off by default: a token
    /// stays usable until it expires even if its user is disabled.
    pub fn with_status_enforcement(mut self, enabled: bool) -> Self {
        self.enforce_user_status = enabled;
        self
    }

    /// Resolve an `Authorization` header value.
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<UserInfo> {
        let token = authorization
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or(AuthError::Unauthorized)?;

        let user_id = self
            .validator
            .user_id(token)
            .map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .users
            .get(user_id)
            .await
            .map_err(|e| AuthError::server("failed to load user", e))?
            .ok_or(AuthError::UserNotFound)?;

        if self.enforce_user_status && !user.is_enabled() {
            warn!(user_id, status = ?user.status, "Token presented for inactive user");
            return Err(AuthError::AccessDenied("user has been disabled".to_string()));
        }

        Ok(user.into())
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("validator", &self.validator)
            .field("enforce_user_status", &self.enforce_user_status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::provider::ProviderError;
    use crate::state::SessionError;
    use crate::token::TokenConfig;
    use crate::users::{MemoryUserStore, UserRole, UserStatus};

    // ── Test doubles ───────────────────────────────────────────────────────

    #[derive(Default)]
    struct TestSession {
        values: HashMap<String, String>,
        fail_save: bool,
        saves: usize,
    }

    #[async_trait]
    impl SessionHandle for TestSession {
        fn get(&self, key: &str) -> Option<String> {
            self.values.get(key).cloned()
        }

        fn set(&mut self, key: &str, value: String) {
            self.values.insert(key.to_string(), value);
        }

        fn remove(&mut self, key: &str) -> Option<String> {
            self.values.remove(key)
        }

        async fn save(&mut self) -> std::result::Result<(), SessionError> {
            if self.fail_save {
                return Err(SessionError("store unavailable".to_string()));
            }
            self.saves += 1;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct FakeProvider {
        profiles: HashMap<String, UpstreamProfile>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn with(code: &str, login: &str) -> Self {
            let mut profiles = HashMap::new();
            profiles.insert(
                code.to_string(),
                UpstreamProfile {
                    id: login.to_string(),
                    name: format!("{} name", login),
                    email: Some(format!("{}@example.com", login)),
                },
            );
            Self {
                profiles,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
            format!(
                "https://idp.test/authorize?redirect_uri={}&state={}",
                urlencoding::encode(redirect_uri),
                state
            )
        }

        async fn exchange_code(&self, code: &str) -> std::result::Result<UpstreamProfile, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.profiles
                .get(code)
                .cloned()
                .ok_or_else(|| ProviderError::Upstream("bad_verification_code".to_string()))
        }
    }

    struct Harness {
        provider: Arc<FakeProvider>,
        users: Arc<MemoryUserStore>,
        initiator: AuthorizationInitiator,
        callback: CallbackHandler,
        resolver: IdentityResolver,
    }

    fn harness() -> Harness {
        let provider = Arc::new(FakeProvider::with("good-code", "octocat"));
        let users = Arc::new(MemoryUserStore::new());
        let config = TokenConfig::new("flow-secret");

        Harness {
            initiator: AuthorizationInitiator::new(provider.clone()),
            callback: CallbackHandler::new(
                provider.clone(),
                users.clone(),
                TokenIssuer::new(&config),
            ),
            resolver: IdentityResolver::new(TokenValidator::new(&config), users.clone()),
            provider,
            users,
        }
    }

    fn callback(code: &str, state: &str) -> CallbackRequest {
        CallbackRequest {
            code: code.to_string(),
            state: state.to_string(),
            redirect_uri: "https://vscode.dev/cb".to_string(),
        }
    }

    // ── Authorize ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_authorize_stores_state() {
        let h = harness();
        let mut session = TestSession::default();

        let resp = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();

        assert!(resp.state.len() >= 12);
        assert!(resp.authorization_url.contains("https%3A%2F%2Fvscode.dev%2Fcb"));
        assert!(resp.authorization_url.contains(&resp.state));
        assert_eq!(session.get(PENDING_STATE_KEY), Some(resp.state));
        assert_eq!(session.saves, 1);
    }

    #[tokio::test]
    async fn test_authorize_requires_redirect_uri() {
        let h = harness();
        let mut session = TestSession::default();

        for uri in [None, Some("")] {
            let err = h.initiator.authorize(uri, &mut session).await.unwrap_err();
            assert_eq!(err.kind(), "invalid_request");
        }
        assert!(session.get(PENDING_STATE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_authorize_session_save_failure() {
        let h = harness();
        let mut session = TestSession {
            fail_save: true,
            ..Default::default()
        };

        let err = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "server_error");
        assert_eq!(err.description(), "failed to save session");
    }

    // ── Callback ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_callback_creates_user_and_issues_token() {
        let h = harness();
        let mut session = TestSession::default();
        let auth = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();

        let resp = h
            .callback
            .handle(callback("good-code", &auth.state), &mut session)
            .await
            .unwrap();

        assert_eq!(resp.token_type, "Bearer");
        assert_eq!(resp.scope, "user");
        assert_eq!(resp.account.label, "octocat");
        assert_eq!(resp.account.email, "octocat@example.com");

        let stored = h.users.get(resp.account.id).await.unwrap().unwrap();
        assert_eq!(stored.github_id, "octocat");
        assert_eq!(stored.display_name, "octocat name");

        let info = h
            .resolver
            .resolve(Some(&format!("Bearer {}", resp.access_token)))
            .await
            .unwrap();
        assert_eq!(info.id, resp.account.id);
        assert_eq!(info.username, "octocat");
        assert_eq!(info.role, UserRole::Common.code());
    }

    #[tokio::test]
    async fn test_callback_state_mismatch_skips_exchange() {
        let h = harness();
        let mut session = TestSession::default();
        h.initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();

        let err = h
            .callback
            .handle(callback("good-code", "not-the-state"), &mut session)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
        assert!(h.users.is_empty().await);
    }

    #[tokio::test]
    async fn test_callback_without_pending_state() {
        let h = harness();
        let mut session = TestSession::default();

        let err = h
            .callback
            .handle(callback("good-code", "anything"), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_only_latest_state_accepted() {
        let h = harness();
        let mut session = TestSession::default();
        let first = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();
        let second = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();
        assert_ne!(first.state, second.state);

        let err = h
            .callback
            .handle(callback("good-code", &first.state), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");

        h.callback
            .handle(callback("good-code", &second.state), &mut session)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_state_cannot_be_replayed() {
        let h = harness();
        let mut session = TestSession::default();
        let auth = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();

        h.callback
            .handle(callback("good-code", &auth.state), &mut session)
            .await
            .unwrap();
        let err = h
            .callback
            .handle(callback("good-code", &auth.state), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_callback_rejected_code() {
        let h = harness();
        let mut session = TestSession::default();
        let auth = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();

        let err = h
            .callback
            .handle(callback("bad-code", &auth.state), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_grant");
        assert_eq!(err.description(), "bad_verification_code");
    }

    #[tokio::test]
    async fn test_callback_disabled_user_denied() {
        let h = harness();
        h.users
            .insert(UserRecord {
                id: 9,
                github_id: "octocat".into(),
                username: "octo".into(),
                display_name: "Octo".into(),
                email: None,
                status: UserStatus::Disabled,
                role: UserRole::Common,
            })
            .await;

        let mut session = TestSession::default();
        let auth = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();
        let err = h
            .callback
            .handle(callback("good-code", &auth.state), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "access_denied");
    }

    #[tokio::test]
    async fn test_callback_keeps_existing_profile_fields() {
        let h = harness();
        h.users
            .insert(UserRecord {
                id: 3,
                github_id: "octocat".into(),
                username: "local-name".into(),
                display_name: "Local Display".into(),
                email: Some("local@example.com".into()),
                status: UserStatus::Enabled,
                role: UserRole::Admin,
            })
            .await;

        let mut session = TestSession::default();
        let auth = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();
        let resp = h
            .callback
            .handle(callback("good-code", &auth.state), &mut session)
            .await
            .unwrap();

        assert_eq!(resp.account.id, 3);
        assert_eq!(resp.account.label, "local-name");
        assert_eq!(resp.account.email, "local@example.com");
        assert_eq!(h.users.len().await, 1);
    }

    #[test]
    fn test_user_info_wire_shape() {
        let info = UserInfo::from(UserRecord {
            id: 1,
            github_id: "octocat".into(),
            username: "octocat".into(),
            display_name: "Octo".into(),
            email: None,
            status: UserStatus::Enabled,
            role: UserRole::Admin,
        });

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["role"], 10);
        assert_eq!(json["email"], "");
        assert_eq!(json["display_name"], "Octo");
    }

    #[tokio::test]
    async fn test_callback_username_conflict_is_server_error() {
        let h = harness();
        h.users
            .insert(UserRecord {
                id: 1,
                github_id: "someone-else".into(),
                username: "octocat".into(),
                display_name: "Squatter".into(),
                email: None,
                status: UserStatus::Enabled,
                role: UserRole::Common,
            })
            .await;

        let mut session = TestSession::default();
        let auth = h
            .initiator
            .authorize(Some("https://vscode.dev/cb"), &mut session)
            .await
            .unwrap();
        let err = h
            .callback
            .handle(callback("good-code", &auth.state), &mut session)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "server_error");
        assert_eq!(err.description(), "failed to process user");
    }

    #[test]
    fn test_callback_request_parsing() {
        let ok = CallbackRequest::from_json(
            br#"{"code":"c","state":"s","redirect_uri":"https://vscode.dev/cb"}"#,
        )
        .unwrap();
        assert_eq!(ok.code, "c");

        let bodies: [&[u8]; 3] = [
            b"not json",
            br#"{"code":"c","state":"s"}"#,
            br#"{"code":1,"state":"s","redirect_uri":"r"}"#,
        ];
        for body in bodies {
            let err = CallbackRequest::from_json(body).unwrap_err();
            assert_eq!(err.kind(), "invalid_request");
        }
    }

    // ── User info ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_resolve_requires_bearer_header() {
        let h = harness();
        for header in [None, Some("Basic dXNlcjpwYXNz"), Some("bearer abc")] {
            let err = h.resolver.resolve(header).await.unwrap_err();
            assert_eq!(err.kind(), "unauthorized");
        }
    }

    #[tokio::test]
    async fn test_resolve_invalid_token() {
        let h = harness();
        let err = h.resolver.resolve(Some("Bearer garbage")).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_token");
    }

    #[tokio::test]
    async fn test_resolve_deleted_user() {
        let h = harness();
        let issuer = TokenIssuer::new(&TokenConfig::new("flow-secret"));
        let token = issuer.issue(404).unwrap();

        let err = h
            .resolver
            .resolve(Some(&format!("Bearer {}", token)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "user_not_found");
    }

    #[tokio::test]
    async fn test_resolve_disabled_user_grace_window() {
        let h = harness();
        let user = h
            .users
            .create(NewUser {
                github_id: "octocat".into(),
                username: "octocat".into(),
                display_name: "Octo".into(),
                email: None,
            })
            .await
            .unwrap();
        h.users.set_status(user.id, UserStatus::Disabled).await;

        let token = TokenIssuer::new(&TokenConfig::new("flow-secret"))
            .issue(user.id)
            .unwrap();
        let header = format!("Bearer {}", token);

        // Default: token stays usable until it expires.
        assert!(h.resolver.resolve(Some(&header)).await.is_ok());

        let strict = h.resolver.clone().with_status_enforcement(true);
        let err = strict.resolve(Some(&header)).await.unwrap_err();
        assert_eq!(err.kind(), "access_denied");
    }
}
