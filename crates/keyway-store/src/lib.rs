//! Persistent user accounts.
//!
//! [`SqliteUserStore`] implements [`keyway_auth::UserStore`] over a single
//! SQLite file with embedded migrations.

mod error;
mod store;

pub use error::{Error, Result};
pub use store::SqliteUserStore;
