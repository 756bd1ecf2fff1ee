//! HTTP routes.

pub mod health;
pub mod vscode;

pub use health::{HealthResponse, health_routes};
pub use vscode::{AuthorizeParams, authorize_handler, callback_handler, user_handler};
