//! Credential sign-in.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::password::verify_password;
use super::session::{apply_session_cookies, issue_session};
use super::state::AuthState;
use super::storage::lookup_user_by_email;
use super::types::{SigninRequest, UserResponse};
use super::utils::normalize_email;

#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in, session cookies set", body = UserResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn signin(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };
    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(AuthError::Validation("All fields are required".to_string()));
    }

    // Unknown email and wrong password are indistinguishable on the wire.
    let Some(user) = lookup_user_by_email(&pool, &email).await? else {
        return Err(AuthError::Unauthenticated);
    };
    if !verify_password(&request.password, &user.password_hash) {
        return Err(AuthError::Unauthenticated);
    }

    let user_id = user.id.to_string();
    let tokens = issue_session(&auth_state, &user_id, user.is_admin).await?;
    let mut headers = HeaderMap::new();
    apply_session_cookies(&mut headers, auth_state.config(), &tokens)?;

    let body = json!({ "user": UserResponse::from(user) });
    Ok((StatusCode::OK, headers, Json(body)))
}
