//! Editor sign-in handshake and scoped bearer tokens.
//!
//! Lets an editor extension sign a user in through an upstream identity
//! provider (GitHub) and receive a long-lived bearer token that is only good
//! for that editor integration.
//!
//! # Components
//!
//! - [`state`]: anti-forgery state generation and the session capability
//! - [`token`]: scoped token issue/validation (HMAC-signed JWT)
//! - [`provider`]: upstream code exchange (`IdentityProvider`, GitHub client)
//! - [`users`]: user records and the `UserStore` collaborator
//! - [`flow`]: authorize, callback and user-info operations

pub mod error;
pub mod flow;
pub mod provider;
pub mod state;
pub mod token;
pub mod users;

pub use error::{AuthError, Result};
pub use flow::{
    AccountInfo, AuthorizationInitiator, AuthorizationResponse, CallbackHandler, CallbackRequest,
    IdentityResolver, TokenResponse, UserInfo,
};
pub use provider::{GitHubConfig, GitHubProvider, IdentityProvider, ProviderError, UpstreamProfile};
pub use state::{PENDING_STATE_KEY, STATE_LENGTH, SessionError, SessionHandle, generate_state};
pub use token::{
    DEFAULT_SCOPE, DEFAULT_VALIDITY, ScopedClaims, TokenConfig, TokenError, TokenIssuer,
    TokenValidator,
};
pub use users::{MemoryUserStore, NewUser, StoreError, UserRecord, UserRole, UserStatus, UserStore};
