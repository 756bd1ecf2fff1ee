//! Editor sign-in endpoints.
//!
//! - `GET /vscode/authorize?redirect_uri=…` starts a sign-in
//! - `POST /vscode/callback` completes it and returns a scoped token
//! - `GET /vscode/user` resolves a scoped token to its user

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, header::AUTHORIZATION},
};
use keyway_auth::{AuthError, AuthorizationResponse, CallbackRequest, TokenResponse, UserInfo};
use serde::Deserialize;

use crate::error::Result;
use crate::session::SessionExt;
use crate::state::AppState;

/// Query parameters for the authorize endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeParams {
    pub redirect_uri: Option<String>,
}

/// Start a sign-in and bind its state to the caller's session.
pub async fn authorize_handler(
    State(state): State<AppState>,
    session: SessionExt,
    params: std::result::Result<Query<AuthorizeParams>, QueryRejection>,
) -> Result<Json<AuthorizationResponse>> {
    let Query(params) =
        params.map_err(|_| AuthError::InvalidRequest("invalid parameters".to_string()))?;

    let mut session = session.lock().await;
    let response = state
        .initiator
        .authorize(params.redirect_uri.as_deref(), &mut *session)
        .await?;

    Ok(Json(response))
}

/// Complete a sign-in.
///
/// The body is parsed by hand so a malformed payload maps to
/// `invalid_request` rather than axum's own rejection.
pub async fn callback_handler(
    State(state): State<AppState>,
    session: SessionExt,
    body: Bytes,
) -> Result<Json<TokenResponse>> {
    let request = CallbackRequest::from_json(&body)?;

    let mut session = session.lock().await;
    let response = state.callback.handle(request, &mut *session).await?;
    Ok(Json(response))
}

/// Return the profile of the token holder.
pub async fn user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserInfo>> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let user = state.resolver.resolve(authorization).await?;
    Ok(Json(user))
}
