//! Server-side session store.
//!
//! Sessions are small string maps keyed by an opaque id that the HTTP layer
//! keeps in a cookie. The store provides:
//! - LRU eviction to bound memory
//! - Idle TTL so abandoned sign-in attempts disappear
//! - An optional background sweep of expired sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use keyway_session::{SessionStore, StoreConfig};
//!
//! let store = SessionStore::new(StoreConfig::default().with_ttl(Duration::from_secs(600)));
//! let id = SessionStore::new_id();
//! let mut data = store.load(&id).await.unwrap_or_default();
//! data.set("key", "value");
//! store.save(&id, data).await?;
//! ```

mod config;
mod data;
mod error;
mod store;

pub use config::StoreConfig;
pub use data::SessionData;
pub use error::{Error, Result};
pub use store::{SessionStore, StoreStats};
