//! Scoped bearer tokens.
//!
//! A scoped token is a compact JWT signed with a deployment-wide HMAC secret:
//!
//! ```text
//! { "user_id": 42, "scope": "vscode", "iat": 1700000000, "exp": 1702592000 }
//! ```
//!
//! Tokens are never stored. Validity is decided entirely by the signature and
//! the embedded claims, so the only way to invalidate every outstanding token
//! is to rotate the secret.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scope string identifying the editor integration.
pub const DEFAULT_SCOPE: &str = "vscode";

/// Lifetime of an issued token (30 days).
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Signing algorithm used for new tokens.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Header algorithms accepted on validation. Anything outside the HMAC family
/// is rejected before the signature is checked.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token errors.
///
/// Validation has a single failure variant; callers cannot tell which check
/// rejected the token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token could not be signed.
    #[error("Failed to sign token: {0}")]
    Signing(String),

    /// The token failed validation.
    #[error("Invalid token")]
    Invalid,
}

/// Token signing configuration.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    /// Scope embedded in and required of every token.
    pub scope: String,
    /// How long an issued token stays valid.
    pub validity: Duration,
}

impl TokenConfig {
    /// Create a config with the default scope and validity.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            scope: DEFAULT_SCOPE.to_string(),
            validity: DEFAULT_VALIDITY,
        }
    }

    /// Override the token validity window.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Override the scope string.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("validity", &self.validity)
            .finish()
    }
}

/// Claims carried by a scoped token.
///
/// Issued tokens always carry `iat`; validation does not require it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedClaims {
    pub user_id: i64,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
}

impl ScopedClaims {
    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Issues scoped tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    scope: String,
    validity: chrono::Duration,
}

impl TokenIssuer {
    /// Create an issuer from the shared configuration.
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(&config.secret),
            scope: config.scope.clone(),
            validity: chrono::Duration::from_std(config.validity)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Issue a token for `user_id` valid from now.
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token for `user_id` as if it were `now`.
    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.validity)
            .ok_or_else(|| TokenError::Signing("expiry overflows".to_string()))?;

        let claims = ScopedClaims {
            user_id,
            scope: self.scope.clone(),
            iat: Some(now.timestamp()),
            exp: expires.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("scope", &self.scope)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

/// Validates scoped tokens.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    scope: String,
    validation: Validation,
}

impl TokenValidator {
    /// Create a validator from the shared configuration.
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(&config.secret),
            scope: config.scope.clone(),
            validation,
        }
    }

    /// Validate a token and return its claims.
    pub fn validate(&self, token: &str) -> Result<ScopedClaims, TokenError> {
        let data = jsonwebtoken::decode::<ScopedClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "Scoped token rejected");
                TokenError::Invalid
            })?;

        if data.claims.scope != self.scope {
            debug!(scope = %data.claims.scope, "Scoped token rejected: wrong scope");
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }

    /// Validate a token and return only the user id.
    pub fn user_id(&self, token: &str) -> Result<i64, TokenError> {
        self.validate(token).map(|claims| claims.user_id)
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
