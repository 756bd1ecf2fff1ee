//! Start command - launches the keyway server.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::{info, warn};

use keyway_auth::{GitHubConfig, GitHubProvider, MemoryUserStore, UserStore};
use keyway_server::{AppState, Server, ServerConfig};
use keyway_session::{SessionStore, StoreConfig};
use keyway_store::SqliteUserStore;

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;

    // ── Listener ────────────────────────────────────────────────────────

    let server_section = config.server();
    let bind = args.bind.unwrap_or(server_section.bind);
    let port = args.port.unwrap_or(server_section.port);
    let ip: IpAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", bind))?;
    let addr = SocketAddr::new(ip, port);

    // ── Tokens and upstream ─────────────────────────────────────────────

    let tokens = super::token_config(&config)?;

    let github = config.github();
    if github.client_id.is_empty() {
        anyhow::bail!("missing required field 'client_id' in [github]");
    }
    let client_secret = config.github_client_secret()?;
    let provider = GitHubProvider::new(GitHubConfig {
        client_id: github.client_id,
        client_secret: client_secret.value,
        authorize_url: github.authorize_url,
        token_url: github.token_url,
        user_url: github.user_url,
        ..GitHubConfig::new("", "")
    })?;

    // ── Users and sessions ──────────────────────────────────────────────

    let users: Arc<dyn UserStore> = match config.database_path() {
        Some(path) => Arc::new(
            SqliteUserStore::open(&path)
                .with_context(|| format!("opening user database {}", path.display()))?,
        ),
        None => {
            warn!("No [database] path configured; users are kept in memory only");
            Arc::new(MemoryUserStore::new())
        }
    };

    let session = config.session();
    let sessions = SessionStore::new(
        StoreConfig::new()
            .with_max_sessions(session.max_sessions)
            .with_ttl(session.ttl()),
    );

    // ── Server ──────────────────────────────────────────────────────────

    let server_config = ServerConfig::new()
        .with_bind_address(addr)
        .with_cookie_name(session.cookie_name)
        .with_cookie_secure(session.cookie_secure)
        .with_request_logging(server_section.request_logging)
        .with_route_prefix(server_section.route_prefix);

    let state = AppState::new(server_config, sessions, Arc::new(provider), users, &tokens)
        .with_status_enforcement(config.auth().enforce_user_status);

    if !ctx.json_output {
        println!("keyway listening on http://{}", addr);
    }
    info!(%addr, "keyway starting");

    Server::new(state).run().await?;
    Ok(())
}
