//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use reqwest::Client;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use keyway_auth::{GitHubConfig, GitHubProvider, MemoryUserStore, TokenConfig};
use keyway_server::{AppState, Server, ServerConfig};
use keyway_session::{SessionStore, StoreConfig};

/// Code the fake GitHub accepts.
pub const GOOD_CODE: &str = "good-code";

/// Login returned by the fake GitHub.
pub const LOGIN: &str = "octocat";

/// Token signing secret used by the test server.
pub const SECRET: &str = "integration-test-secret";

const UPSTREAM_TOKEN: &str = "gho_integration";

/// A test server that runs in the background.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub users: Arc<MemoryUserStore>,
    pub tokens: TokenConfig,
    _handle: JoinHandle<()>,
    _github: JoinHandle<()>,
}

impl TestServer {
    /// Start a server backed by a fake GitHub and an in-memory user store.
    pub async fn start() -> Result<Self> {
        Self::start_with(false).await
    }

    /// Start a server, optionally refusing tokens of disabled users.
    pub async fn start_with(enforce_user_status: bool) -> Result<Self> {
        let (github_url, github) = spawn_fake_github().await?;

        let provider = GitHubProvider::new(
            GitHubConfig::new("test-client", "test-secret").with_base_urls(&github_url, &github_url),
        )?;

        let addr = find_available_port().await?;
        let users = Arc::new(MemoryUserStore::new());
        let tokens = TokenConfig::new(SECRET);

        let state = AppState::new(
            ServerConfig::new()
                .with_bind_address(addr)
                .with_request_logging(false),
            SessionStore::new(StoreConfig::new().with_cleanup_task(false)),
            Arc::new(provider),
            users.clone(),
            &tokens,
        )
        .with_status_enforcement(enforce_user_status);

        let server = Server::new(state);
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            users,
            tokens,
            _handle: handle,
            _github: github,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Call the authorize endpoint, forwarding `cookie` if given.
    pub async fn authorize(
        &self,
        redirect_uri: Option<&str>,
        cookie: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut request = self.client.get(format!("{}/vscode/authorize", self.base_url()));
        if let Some(uri) = redirect_uri {
            request = request.query(&[("redirect_uri", uri)]);
        }
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        Ok(request.send().await?)
    }

    /// Start a sign-in in a new session; returns `(cookie, state)`.
    pub async fn begin(&self, redirect_uri: &str) -> Result<(String, String)> {
        let resp = self.authorize(Some(redirect_uri), None).await?;
        anyhow::ensure!(resp.status().is_success(), "authorize failed: {}", resp.status());

        let cookie = session_cookie(&resp)?;
        let body: Value = resp.json().await?;
        let state = body["state"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no state in {body}"))?
            .to_string();
        Ok((cookie, state))
    }

    /// Post a callback body, forwarding `cookie` if given.
    pub async fn callback(&self, cookie: Option<&str>, body: &Value) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(format!("{}/vscode/callback", self.base_url()))
            .json(body);
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        Ok(request.send().await?)
    }

    /// Call the user endpoint with a bearer token.
    pub async fn user(&self, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}/vscode/user", self.base_url()))
            .bearer_auth(token)
            .send()
            .await?)
    }
}

/// Extract `name=value` from the response's `Set-Cookie` header.
pub fn session_cookie(resp: &reqwest::Response) -> Result<String> {
    let header = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .ok_or_else(|| anyhow::anyhow!("response has no Set-Cookie"))?
        .to_str()?;
    Ok(header.split(';').next().unwrap_or_default().to_string())
}

/// Callback body for a code and state.
pub fn callback_body(code: &str, state: &str) -> Value {
    json!({
        "code": code,
        "state": state,
        "redirect_uri": "https://vscode.dev/cb",
    })
}

/// Minimal GitHub: one valid code, one user.
async fn spawn_fake_github() -> Result<(String, JoinHandle<()>)> {
    async fn token(Json(body): Json<Value>) -> Json<Value> {
        if body["code"] == GOOD_CODE && body["client_id"] == "test-client" {
            Json(json!({ "access_token": UPSTREAM_TOKEN, "token_type": "bearer" }))
        } else {
            Json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired.",
            }))
        }
    }

    async fn user(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        let expected = format!("Bearer {UPSTREAM_TOKEN}");
        match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some(auth) if auth == expected => (
                StatusCode::OK,
                Json(json!({
                    "login": LOGIN,
                    "name": "The Octocat",
                    "email": "octocat@example.com",
                })),
            ),
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Bad credentials" })),
            ),
        }
    }

    let app = Router::new()
        .route("/login/oauth/access_token", post(token))
        .route("/user", get(user));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((url, handle))
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
