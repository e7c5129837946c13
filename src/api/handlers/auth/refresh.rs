//! Session refresh: rotate the whole cookie trio off a live refresh token.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::error::AuthError;
use super::session::{apply_session_cookies, extract_cookie, issue_session, REFRESH_COOKIE};
use super::state::AuthState;
use super::storage::lookup_user_by_id;
use super::types::UserResponse;

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New session cookies set", body = UserResponse),
        (status = 401, description = "Missing, invalid, superseded, or revoked refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(token) = extract_cookie(&headers, REFRESH_COOKIE) else {
        return Err(AuthError::Unauthenticated);
    };

    // Signature, expiry, blacklist, and the exact registry match all happen
    // inside the vault; a superseded token dies here.
    let Some(user_id) = auth_state.tokens().verify_refresh_token(&token).await else {
        return Err(AuthError::Unauthenticated);
    };

    let parsed = Uuid::parse_str(&user_id).map_err(|_| AuthError::Unauthenticated)?;
    let Some(user) = lookup_user_by_id(&pool, parsed).await? else {
        // Token outlived the account.
        return Err(AuthError::Unauthenticated);
    };

    let tokens = issue_session(&auth_state, &user_id, user.is_admin).await?;
    let mut response_headers = HeaderMap::new();
    apply_session_cookies(&mut response_headers, auth_state.config(), &tokens)?;

    let body = json!({ "user": UserResponse::from(user) });
    Ok((StatusCode::OK, response_headers, Json(body)))
}
