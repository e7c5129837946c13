//! Pre-signup helpers: password policy probes and identifier availability.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;

use super::error::AuthError;
use super::password::{generate_strong_password, validate_password};
use super::storage::{lookup_user_by_email, lookup_user_by_username};
use super::types::ValidatePasswordRequest;
use super::utils::normalize_email;

#[utoipa::path(
    post,
    path = "/api/auth/validate-password",
    request_body = ValidatePasswordRequest,
    responses(
        (status = 200, description = "Policy verdict with per-rule errors")
    ),
    tag = "auth"
)]
pub async fn validate(
    payload: Option<Json<ValidatePasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };
    let check = validate_password(&request.password);
    Ok((
        StatusCode::OK,
        Json(json!({
            "is_valid": check.is_valid,
            "score": check.score,
            "strength": check.strength,
            "errors": check.errors,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/generate-password",
    responses(
        (status = 200, description = "A policy-compliant random password")
    ),
    tag = "auth"
)]
pub async fn generate() -> impl IntoResponse {
    let password = generate_strong_password();
    let validation = validate_password(&password);
    (
        StatusCode::OK,
        Json(json!({
            "password": password,
            "validation": validation,
        })),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/check-email/{email}",
    params(("email" = String, Path, description = "Email to check")),
    responses(
        (status = 200, description = "Availability verdict")
    ),
    tag = "auth"
)]
pub async fn check_email(
    pool: Extension<PgPool>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    let taken = lookup_user_by_email(&pool, &normalize_email(&email))
        .await?
        .is_some();
    Ok((
        StatusCode::OK,
        Json(json!({
            "available": !taken,
            "message": if taken { "Email already exists" } else { "Email is available" },
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/check-username/{username}",
    params(("username" = String, Path, description = "Username to check")),
    responses(
        (status = 200, description = "Availability verdict")
    ),
    tag = "auth"
)]
pub async fn check_username(
    pool: Extension<PgPool>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    let taken = lookup_user_by_username(&pool, username.trim())
        .await?
        .is_some();
    Ok((
        StatusCode::OK,
        Json(json!({
            "available": !taken,
            "message": if taken { "Username already exists" } else { "Username is available" },
        })),
    ))
}
