//! Logout endpoints.
//!
//! Plain logout is best-effort: every revocation step is attempted
//! independently, failures are logged, and the client always gets a 200 with
//! cleared cookies. A user with no live session logging out is a success.

use axum::{
    extract::Extension,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::AuthError;
use super::principal::{enforce_csrf, require_auth};
use super::session::{
    apply_clear_cookies, extract_access_token, extract_cookie, REFRESH_COOKIE,
};
use super::state::AuthState;
use super::tokens::TokenKind;

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared; any live tokens revoked")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let access_token = extract_access_token(&headers);
    let refresh_token = extract_cookie(&headers, REFRESH_COOKIE);

    // Opportunistic identity: a dead access token just means the per-user
    // cleanup is skipped.
    let user_id = match &access_token {
        Some(token) => auth_state
            .tokens()
            .verify_access_token(token)
            .await
            .map(|principal| principal.id),
        None => None,
    };

    if let Some(user_id) = &user_id {
        if let Err(err) = auth_state.tokens().revoke_refresh_token(user_id).await {
            warn!(user_id, "logout: refresh revoke failed: {err:#}");
        }
        if let Err(err) = auth_state.csrf().revoke_all(user_id).await {
            warn!(user_id, "logout: csrf revoke failed: {err:#}");
        }
    } else {
        debug!("logout without a verifiable access token");
    }

    if let Err(err) = auth_state
        .tokens()
        .blacklist_token(access_token.as_deref(), TokenKind::Access)
        .await
    {
        warn!("logout: access blacklist failed: {err:#}");
    }
    if let Err(err) = auth_state
        .tokens()
        .blacklist_token(refresh_token.as_deref(), TokenKind::Refresh)
        .await
    {
        warn!("logout: refresh blacklist failed: {err:#}");
    }

    let mut response_headers = HeaderMap::new();
    apply_clear_cookies(&mut response_headers, auth_state.config())?;
    Ok((
        StatusCode::OK,
        response_headers,
        Json(json!({ "message": "Logged out successfully" })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "All sessions revoked, cookies cleared"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "CSRF check failed")
    ),
    tag = "auth"
)]
pub async fn logout_all(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, &auth_state).await?;
    enforce_csrf(&Method::POST, &headers, None, &auth_state, &principal).await?;

    // One registry key holds the only live refresh token, so deleting it
    // logs out every device at once.
    auth_state
        .tokens()
        .revoke_refresh_token(&principal.id)
        .await?;
    auth_state.csrf().revoke_all(&principal.id).await?;
    auth_state
        .tokens()
        .blacklist_token(extract_access_token(&headers).as_deref(), TokenKind::Access)
        .await?;

    let mut response_headers = HeaderMap::new();
    apply_clear_cookies(&mut response_headers, auth_state.config())?;
    Ok((
        StatusCode::OK,
        response_headers,
        Json(json!({ "message": "Logged out from all devices" })),
    ))
}
