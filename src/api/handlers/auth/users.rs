//! Account management: profile updates, the admin flag, and deletion.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::password::{hash_password, validate_password};
use super::principal::{enforce_csrf, require_admin, require_auth, Principal};
use super::session::extract_access_token;
use super::state::AuthState;
use super::storage::{
    delete_user, lookup_user_by_email, lookup_user_by_username, update_admin_flag,
    update_user_profile, InsertOutcome, ProfileChanges,
};
use super::tokens::TokenKind;
use super::types::{AdminFlagRequest, UpdateProfileRequest, UserResponse};
use super::utils::{normalize_email, valid_email};

fn parse_user_id(id: &str) -> Result<uuid::Uuid, AuthError> {
    uuid::Uuid::parse_str(id).map_err(|_| AuthError::Validation("Invalid user id".to_string()))
}

/// Compare the caller against a target id on parsed `Uuid` values.
///
/// `Uuid::parse_str` accepts simple, uppercase, and urn encodings, so a raw
/// string comparison would let a non-canonical spelling of the caller's own
/// id slip past ownership checks.
fn is_self(principal: &Principal, target: uuid::Uuid) -> bool {
    uuid::Uuid::parse_str(&principal.id).is_ok_and(|own| own == target)
}

/// Invalidate the refresh registry entry and every CSRF token for the user.
///
/// Run on credential-bearing changes (password change, account deletion);
/// a live access token is left to die at expiry unless the caller also
/// blacklists it.
async fn revoke_credentials(state: &AuthState, user_id: &str) -> Result<(), AuthError> {
    state.tokens().revoke_refresh_token(user_id).await?;
    state.csrf().revoke_all(user_id).await?;
    Ok(())
}

#[utoipa::path(
    put,
    path = "/api/user/{id}/admin",
    request_body = AdminFlagRequest,
    params(("id" = String, Path, description = "Target user id")),
    responses(
        (status = 200, description = "Admin flag updated", body = UserResponse),
        (status = 400, description = "Unknown or invalid user id"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not an admin, CSRF failure, or self-targeting")
    ),
    tag = "users"
)]
pub async fn set_admin_flag(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<String>,
    payload: Option<Json<AdminFlagRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_admin(&headers, &auth_state).await?;
    enforce_csrf(&Method::PUT, &headers, None, &auth_state, &principal).await?;

    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    // Rejected regardless of the requested value; admins cannot touch their
    // own flag in either direction.
    let target = parse_user_id(&id)?;
    if is_self(&principal, target) {
        return Err(AuthError::Forbidden(
            "Cannot change your own admin status".to_string(),
        ));
    }

    let Some(updated) = update_admin_flag(&pool, target, request.is_admin).await? else {
        return Err(AuthError::Validation("User not found".to_string()));
    };
    info!(
        admin = principal.id,
        target = id,
        is_admin = request.is_admin,
        "admin flag updated"
    );
    Ok((StatusCode::OK, Json(json!({ "user": UserResponse::from(updated) }))))
}

#[utoipa::path(
    put,
    path = "/api/user/{id}",
    request_body = UpdateProfileRequest,
    params(("id" = String, Path, description = "Target user id")),
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid field or unknown user"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner, or CSRF failure"),
        (status = 409, description = "Email or username already taken")
    ),
    tag = "users"
)]
pub async fn update_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<String>,
    payload: Option<Json<UpdateProfileRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, &auth_state).await?;
    enforce_csrf(&Method::PUT, &headers, None, &auth_state, &principal).await?;

    // Profile edits are strictly self-service; admins go through the
    // admin-flag endpoint for the one field they may touch on others.
    let target = parse_user_id(&id)?;
    if !is_self(&principal, target) {
        return Err(AuthError::Forbidden(
            "You can only update your own account".to_string(),
        ));
    }

    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let username = request
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty());

    if let Some(email) = &email {
        if !valid_email(email) {
            return Err(AuthError::Validation("Invalid email".to_string()));
        }
        if let Some(existing) = lookup_user_by_email(&pool, email).await? {
            if existing.id != target {
                return Err(AuthError::Conflict("Email already exists".to_string()));
            }
        }
    }
    if let Some(username) = username {
        if let Some(existing) = lookup_user_by_username(&pool, username).await? {
            if existing.id != target {
                return Err(AuthError::Conflict("Username already exists".to_string()));
            }
        }
    }

    let password_hash = match request.password.as_deref() {
        Some(password) => {
            let check = validate_password(password);
            if !check.is_valid {
                return Err(AuthError::PasswordPolicy(check.errors));
            }
            Some(hash_password(password)?)
        }
        None => None,
    };

    let changes = ProfileChanges {
        username,
        email: email.as_deref(),
        password_hash: password_hash.as_deref(),
        profile_picture: request.profile_picture.as_deref(),
    };
    match update_user_profile(&pool, target, &changes).await? {
        Some(InsertOutcome::Created(updated)) => {
            // A password change is a revocation event: the old refresh token
            // and every CSRF token stop working immediately.
            if password_hash.is_some() {
                revoke_credentials(&auth_state, &principal.id).await?;
            }
            info!(user = principal.id, "profile updated");
            Ok((
                StatusCode::OK,
                Json(json!({ "user": UserResponse::from(updated) })),
            ))
        }
        // Pre-checks raced another writer; the unique constraint decides.
        Some(InsertOutcome::Conflict) => Err(AuthError::Conflict(
            "Email or username already exists".to_string(),
        )),
        None => Err(AuthError::Validation("User not found".to_string())),
    }
}

#[utoipa::path(
    delete,
    path = "/api/user/{id}",
    params(("id" = String, Path, description = "Target user id")),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 400, description = "Unknown or invalid user id"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner and not an admin, or CSRF failure")
    ),
    tag = "users"
)]
pub async fn delete_account(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, &auth_state).await?;
    enforce_csrf(&Method::DELETE, &headers, None, &auth_state, &principal).await?;

    let target = parse_user_id(&id)?;
    let deleting_self = is_self(&principal, target);
    if !deleting_self && !principal.is_admin {
        return Err(AuthError::Forbidden(
            "You can only delete your own account".to_string(),
        ));
    }

    if !delete_user(&pool, target).await? {
        return Err(AuthError::Validation("User not found".to_string()));
    }

    // A deleted account must not keep a working session. Revocation keys use
    // the canonical id; the path segment may be spelled differently.
    if deleting_self {
        revoke_credentials(&auth_state, &principal.id).await?;
        auth_state
            .tokens()
            .blacklist_token(extract_access_token(&headers).as_deref(), TokenKind::Access)
            .await?;
    } else {
        // Deleting someone else: kill their refresh path; their access token
        // dies at expiry.
        revoke_credentials(&auth_state, &target.to_string()).await?;
    }

    info!(actor = principal.id, target = id, "account deleted");
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Account deleted successfully" })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::csrf::CsrfGuard;
    use crate::api::handlers::auth::state::AuthConfig;
    use crate::api::handlers::auth::tokens::TokenVault;
    use crate::kv::InMemoryKv;
    use anyhow::Result;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn state() -> AuthState {
        let kv: Arc<InMemoryKv> = Arc::new(InMemoryKv::new());
        let config = AuthConfig::new("https://blog.example".to_string());
        let tokens = TokenVault::new(
            kv.clone(),
            &SecretString::from("access-secret"),
            &SecretString::from("refresh-secret"),
            config.access_ttl(),
            config.refresh_ttl(),
        );
        let csrf = CsrfGuard::new(kv, config.csrf_ttl());
        AuthState::new(config, tokens, csrf)
    }

    // Never connects; the paths under test return before any query.
    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost:5432/unused")
            .expect("lazy pool")
    }

    async fn session_headers(state: &AuthState, user_id: &str, is_admin: bool) -> Result<HeaderMap> {
        let access = state.tokens().issue_access_token(user_id, is_admin)?;
        let csrf = state.csrf().generate(Some(user_id)).await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("access_token={access}; csrf_token={csrf}"))?,
        );
        headers.insert("x-csrf-token", HeaderValue::from_str(&csrf)?);
        Ok(headers)
    }

    #[tokio::test]
    async fn admin_cannot_change_own_flag() -> Result<()> {
        let state = state();
        let admin_id = Uuid::new_v4();
        let headers = session_headers(&state, &admin_id.to_string(), true).await?;
        let result = set_admin_flag(
            headers,
            Extension(lazy_pool()),
            Extension(Arc::new(state)),
            Path(admin_id.to_string()),
            Some(Json(AdminFlagRequest { is_admin: false })),
        )
        .await;
        assert!(matches!(result, Err(AuthError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn self_guard_holds_for_alternate_uuid_spellings() -> Result<()> {
        let state = state();
        let admin_id = Uuid::new_v4();
        let state = Arc::new(state);

        // Simple (no hyphens), uppercase, and urn encodings all parse to the
        // same id and must hit the same rejection.
        for spelling in [
            admin_id.simple().to_string(),
            admin_id.to_string().to_uppercase(),
            admin_id.urn().to_string(),
        ] {
            let headers = session_headers(&state, &admin_id.to_string(), true).await?;
            let result = set_admin_flag(
                headers,
                Extension(lazy_pool()),
                Extension(state.clone()),
                Path(spelling.clone()),
                Some(Json(AdminFlagRequest { is_admin: false })),
            )
            .await;
            assert!(
                matches!(result, Err(AuthError::Forbidden(_))),
                "spelling not caught: {spelling}"
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn non_admin_cannot_touch_the_flag() -> Result<()> {
        let state = state();
        let headers = session_headers(&state, &Uuid::new_v4().to_string(), false).await?;
        let result = set_admin_flag(
            headers,
            Extension(lazy_pool()),
            Extension(Arc::new(state)),
            Path(Uuid::new_v4().to_string()),
            Some(Json(AdminFlagRequest { is_admin: true })),
        )
        .await;
        assert!(matches!(result, Err(AuthError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn non_admin_cannot_delete_someone_else() -> Result<()> {
        let state = state();
        let headers = session_headers(&state, &Uuid::new_v4().to_string(), false).await?;
        let result = delete_account(
            headers,
            Extension(lazy_pool()),
            Extension(Arc::new(state)),
            Path(Uuid::new_v4().to_string()),
        )
        .await;
        assert!(matches!(result, Err(AuthError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn profile_update_is_self_service_only() -> Result<()> {
        let state = state();
        let headers = session_headers(&state, &Uuid::new_v4().to_string(), false).await?;
        let result = update_profile(
            headers,
            Extension(lazy_pool()),
            Extension(Arc::new(state)),
            Path(Uuid::new_v4().to_string()),
            Some(Json(UpdateProfileRequest::default())),
        )
        .await;
        assert!(matches!(result, Err(AuthError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn state_changing_routes_demand_csrf() -> Result<()> {
        let state = state();
        let user_id = Uuid::new_v4().to_string();
        let access = state.tokens().issue_access_token(&user_id, true)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("access_token={access}"))?,
        );
        let result = delete_account(
            headers,
            Extension(lazy_pool()),
            Extension(Arc::new(state)),
            Path(user_id),
        )
        .await;
        let Err(err) = result else {
            panic!("missing csrf token must be rejected");
        };
        assert_eq!(
            err.into_response().status(),
            axum::http::StatusCode::FORBIDDEN
        );
        Ok(())
    }

    #[tokio::test]
    async fn credential_revocation_kills_refresh_and_csrf() -> Result<()> {
        let state = state();
        let user_id = Uuid::new_v4().to_string();
        let refresh = state.tokens().issue_refresh_token(&user_id).await?;
        let csrf = state.csrf().generate(Some(&user_id)).await?;

        revoke_credentials(&state, &user_id).await?;

        assert!(state.tokens().verify_refresh_token(&refresh).await.is_none());
        assert!(!state.csrf().verify(&csrf, &user_id).await?);
        Ok(())
    }
}
