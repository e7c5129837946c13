//! Account registration.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;

use super::error::AuthError;
use super::password::{hash_password, validate_password};
use super::storage::{insert_user, lookup_user_by_email, lookup_user_by_username, InsertOutcome};
use super::types::SignupRequest;
use super::utils::{normalize_email, valid_email};

const DEFAULT_PROFILE_PICTURE: &str =
    "https://cdn.pixabay.com/photo/2015/10/05/22/37/blank-profile-picture-973460_960_720.png";

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Validation or password policy failure"),
        (status = 409, description = "Email or username already exists")
    ),
    tag = "auth"
)]
pub async fn signup(
    pool: Extension<PgPool>,
    payload: Option<Json<SignupRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let username = request.username.trim().to_string();
    let email = normalize_email(&request.email);
    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(AuthError::Validation("All fields are required".to_string()));
    }
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    let check = validate_password(&request.password);
    if !check.is_valid {
        return Err(AuthError::PasswordPolicy(check.errors));
    }

    // Two independent checks keep the error messages specific; the unique
    // constraints still close the race below.
    if lookup_user_by_email(&pool, &email).await?.is_some() {
        return Err(AuthError::Conflict("Email already exists".to_string()));
    }
    if lookup_user_by_username(&pool, &username).await?.is_some() {
        return Err(AuthError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let outcome = insert_user(
        &pool,
        &username,
        &email,
        &password_hash,
        Some(DEFAULT_PROFILE_PICTURE),
        false,
    )
    .await?;

    match outcome {
        InsertOutcome::Created(record) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Signup successful",
                "userId": record.id.to_string(),
            })),
        )),
        InsertOutcome::Conflict => {
            Err(AuthError::Conflict("Email or username already exists".to_string()))
        }
    }
}
