//! Cookie-bound sessions for the sign-in handshake.
//!
//! The middleware loads (or starts) the caller's session from the session
//! cookie and hands it to handlers through request extensions. A cookie is
//! only issued for a new session once a handler has saved it, so requests
//! that never store state leave no session behind.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Extension,
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use keyway_auth::{SessionError, SessionHandle};
use keyway_session::{SessionData, SessionStore};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::state::AppState;

/// A session loaded for one request.
#[derive(Debug)]
pub struct CookieSession {
    id: String,
    data: SessionData,
    store: SessionStore,
    is_new: bool,
    saved: bool,
}

impl CookieSession {
    fn new(id: String, data: SessionData, store: SessionStore, is_new: bool) -> Self {
        Self {
            id,
            data,
            store,
            is_new,
            saved: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

#[async_trait]
impl SessionHandle for CookieSession {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(str::to_string)
    }

    fn set(&mut self, key: &str, value: String) {
        self.data.set(key, value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    async fn save(&mut self) -> Result<(), SessionError> {
        self.store
            .save(&self.id, self.data.clone())
            .await
            .map_err(|e| SessionError(e.to_string()))?;
        self.saved = true;
        trace!(session_id = %self.id, "Session saved");
        Ok(())
    }
}

/// Session handle shared between the middleware and the handler.
pub type SharedSession = Arc<Mutex<CookieSession>>;

/// Extractor for the request's session.
pub type SessionExt = Extension<SharedSession>;

/// Session middleware.
///
/// Unknown or expired cookie ids start a fresh session under a new id.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let cookie_name = state.config.cookie_name.as_str();

    let existing = match jar.get(cookie_name) {
        Some(cookie) => {
            let id = cookie.value().to_string();
            state.sessions.load(&id).await.map(|data| (id, data))
        }
        None => None,
    };

    let session = match existing {
        Some((id, data)) => CookieSession::new(id, data, state.sessions.clone(), false),
        None => CookieSession::new(
            SessionStore::new_id(),
            SessionData::new(),
            state.sessions.clone(),
            true,
        ),
    };

    let shared: SharedSession = Arc::new(Mutex::new(session));
    request.extensions_mut().insert(Arc::clone(&shared));

    let response = next.run(request).await;

    let session = shared.lock().await;
    if !(session.is_new && session.saved) {
        return response;
    }

    debug!(session_id = %session.id, "Issuing session cookie");
    let cookie = Cookie::build((state.config.cookie_name.clone(), session.id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure);

    (jar.add(cookie), response).into_response()
}
