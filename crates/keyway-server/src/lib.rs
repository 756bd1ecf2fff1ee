//! HTTP surface of the keyway editor sign-in bridge.
//!
//! Exposes the authorize, callback and user-info operations of
//! [`keyway_auth`] over axum, with cookie-bound server-side sessions from
//! [`keyway_session`].
//!
//! # Example
//!
//! ```ignore
//! use keyway_server::{AppState, Server, ServerConfig};
//!
//! let state = AppState::new(config, sessions, provider, users, &tokens);
//! Server::new(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use session::{CookieSession, SharedSession, session_middleware};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The keyway HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .nest(&self.state.config.route_prefix, self.vscode_routes())
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Editor routes. Only the handshake routes carry a session; the
    /// user-info route is authenticated by its bearer token alone.
    fn vscode_routes(&self) -> Router<AppState> {
        use axum::routing::{get, post};

        let handshake = Router::new()
            .route("/authorize", get(routes::authorize_handler))
            .route("/callback", post(routes::callback_handler))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                session::session_middleware,
            ));

        Router::new()
            .merge(handshake)
            .route("/user", get(routes::user_handler))
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();
        let sweeper = self.state.sessions.spawn_cleanup_task();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        let result = axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)));

        if let Some(handle) = sweeper {
            handle.abort();
        }
        result
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
