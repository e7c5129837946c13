//! CSRF token endpoint and the double-submit diagnostic.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::error::AuthError;
use super::principal::{enforce_csrf, form_csrf_token, optional_auth, require_auth};
use super::session::{extract_cookie, CSRF_COOKIE};
use super::state::AuthState;
use super::types::CsrfTokenResponse;

#[utoipa::path(
    get,
    path = "/api/auth/csrf-token",
    responses(
        (status = 200, description = "CSRF token, also set as a readable cookie", body = CsrfTokenResponse)
    ),
    tag = "auth"
)]
pub async fn csrf_token(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = optional_auth(&headers, &auth_state).await;
    let user_id = principal.map(|p| p.id);

    // Reuse before rotate: a still-valid cookie keeps its registry entry so
    // concurrent tabs do not invalidate each other.
    if let Some(user_id) = &user_id {
        if let Some(existing) = extract_cookie(&headers, CSRF_COOKIE) {
            if auth_state.csrf().verify(&existing, user_id).await? {
                return respond_with_token(&auth_state, existing);
            }
        }
        auth_state.csrf().revoke_all(user_id).await?;
    }

    let token = auth_state.csrf().generate(user_id.as_deref()).await?;
    respond_with_token(&auth_state, token)
}

fn respond_with_token(
    auth_state: &AuthState,
    token: String,
) -> Result<(StatusCode, HeaderMap, Json<CsrfTokenResponse>), AuthError> {
    let config = auth_state.config();
    let mut cookie = format!(
        "{CSRF_COOKIE}={token}; Path=/; SameSite=Lax; Max-Age={}",
        config.csrf_ttl().as_secs()
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|err| AuthError::Dependency(anyhow::anyhow!(err)))?,
    );
    Ok((
        StatusCode::OK,
        headers,
        Json(CsrfTokenResponse { csrf_token: token }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-csrf",
    responses(
        (status = 200, description = "Token passed the double-submit check"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Token failed the check")
    ),
    tag = "auth"
)]
pub async fn verify_csrf(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    body: String,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, &auth_state).await?;
    // Form posts may carry the token as a field instead of the header.
    let form_token = form_csrf_token(&headers, body.as_bytes());
    enforce_csrf(
        &Method::POST,
        &headers,
        form_token.as_deref(),
        &auth_state,
        &principal,
    )
    .await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "CSRF token is valid",
            "user_id": principal.id,
        })),
    ))
}
