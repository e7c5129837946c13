//! Error taxonomy for the auth subsystem.
//!
//! Authentication failures are deliberately coarse: the response never says
//! which check failed, only the category. Dependency failures are logged
//! server-side and surface as an opaque 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// Password rejected by the policy; carries the unmet rules.
    #[error("password does not meet the policy")]
    PasswordPolicy(Vec<String>),

    /// Duplicate email or username.
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials, missing/invalid/expired/blacklisted token.
    #[error("authentication required")]
    Unauthenticated,

    /// CSRF mismatch or insufficient privilege.
    #[error("{0}")]
    Forbidden(String),

    /// KV store or credential store unavailable.
    #[error(transparent)]
    Dependency(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            Self::PasswordPolicy(rules) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Password does not meet the policy", "details": rules }),
            ),
            Self::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication required" }),
            ),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            Self::Dependency(err) => {
                error!("dependency failure: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
