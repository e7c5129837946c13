//! Federated sign-in for provider-verified identities.
//!
//! The frontend completes the OAuth dance with Google or GitHub and posts
//! the verified profile here. An existing email signs in; an unknown one
//! gets a synthesized local account with a throwaway strong password.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::password::{generate_strong_password, hash_password};
use super::session::{apply_session_cookies, issue_session};
use super::state::AuthState;
use super::storage::{insert_user, lookup_user_by_email, InsertOutcome, UserRecord};
use super::types::{FederatedRequest, UserResponse};
use super::utils::{derive_username, normalize_email, valid_email};

const USERNAME_ATTEMPTS: usize = 5;

#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = FederatedRequest,
    responses(
        (status = 200, description = "Signed in, session cookies set", body = UserResponse),
        (status = 400, description = "Invalid profile"),
        (status = 409, description = "Could not allocate a unique username")
    ),
    tag = "auth"
)]
pub async fn google(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<FederatedRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    federated_signin("google", &pool, &auth_state, payload).await
}

#[utoipa::path(
    post,
    path = "/api/auth/github",
    request_body = FederatedRequest,
    responses(
        (status = 200, description = "Signed in, session cookies set", body = UserResponse),
        (status = 400, description = "Invalid profile"),
        (status = 409, description = "Could not allocate a unique username")
    ),
    tag = "auth"
)]
pub async fn github(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<FederatedRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    federated_signin("github", &pool, &auth_state, payload).await
}

async fn federated_signin(
    provider: &'static str,
    pool: &PgPool,
    auth_state: &AuthState,
    payload: Option<Json<FederatedRequest>>,
) -> Result<(StatusCode, HeaderMap, Json<serde_json::Value>), AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    let user = match lookup_user_by_email(pool, &email).await? {
        Some(user) => user,
        None => {
            let user = create_federated_account(pool, &email, &request).await?;
            info!(provider, user_id = %user.id, "created federated account");
            user
        }
    };

    let user_id = user.id.to_string();
    let tokens = issue_session(auth_state, &user_id, user.is_admin).await?;
    let mut headers = HeaderMap::new();
    apply_session_cookies(&mut headers, auth_state.config(), &tokens)?;

    let body = json!({ "user": UserResponse::from(user) });
    Ok((StatusCode::OK, headers, Json(body)))
}

/// Synthesize a local account for a provider identity.
///
/// The password is random, policy-compliant, and discarded after hashing;
/// these accounts only ever sign in through the provider. Username collisions
/// get a fresh digit suffix for a few rounds before failing loudly.
async fn create_federated_account(
    pool: &PgPool,
    email: &str,
    request: &FederatedRequest,
) -> Result<UserRecord, AuthError> {
    let password_hash = hash_password(&generate_strong_password())?;

    for _ in 0..USERNAME_ATTEMPTS {
        let username = derive_username(&request.name);
        let outcome = insert_user(
            pool,
            &username,
            email,
            &password_hash,
            request.photo_url.as_deref(),
            false,
        )
        .await?;
        match outcome {
            InsertOutcome::Created(record) => return Ok(record),
            // Either the username suffix collided or the email raced an
            // earlier request; re-checking the email resolves the latter.
            InsertOutcome::Conflict => {
                if let Some(existing) = lookup_user_by_email(pool, email).await? {
                    return Ok(existing);
                }
            }
        }
    }

    Err(AuthError::Conflict(
        "Could not allocate a unique username".to_string(),
    ))
}
