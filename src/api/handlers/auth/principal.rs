//! Authenticated principal extraction and the CSRF gate.

use axum::http::{header::CONTENT_TYPE, HeaderMap, Method};

use super::error::AuthError;
use super::session::{extract_access_token, extract_cookie, CSRF_COOKIE};
use super::state::AuthState;

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Caller identity carried in a verified access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: String,
    pub is_admin: bool,
}

/// Resolve the access token into a principal, or fail with 401.
///
/// The token is read from the `Authorization` bearer header first, then the
/// `access_token` cookie. Any verification failure collapses to the same
/// uniform 401.
///
/// # Errors
/// Returns `Unauthenticated` when no token is present or the token does not
/// verify.
pub async fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<Principal, AuthError> {
    let Some(token) = extract_access_token(headers) else {
        return Err(AuthError::Unauthenticated);
    };
    state
        .tokens()
        .verify_access_token(&token)
        .await
        .ok_or(AuthError::Unauthenticated)
}

/// Like [`require_auth`], but an absent or invalid token yields `None`.
///
/// Used by endpoints that serve both anonymous and signed-in callers.
pub async fn optional_auth(headers: &HeaderMap, state: &AuthState) -> Option<Principal> {
    let token = extract_access_token(headers)?;
    state.tokens().verify_access_token(&token).await
}

/// Require an admin principal, or fail with 403.
///
/// # Errors
/// Returns `Unauthenticated` for anonymous callers and `Forbidden` for
/// non-admin principals.
pub async fn require_admin(headers: &HeaderMap, state: &AuthState) -> Result<Principal, AuthError> {
    let principal = require_auth(headers, state).await?;
    if !principal.is_admin {
        return Err(AuthError::Forbidden("Admin privileges required".to_string()));
    }
    Ok(principal)
}

/// Read the double-submit token from a form-encoded request body.
///
/// Only consulted when the `X-CSRF-Token` header is absent; JSON bodies
/// never carry the token.
#[must_use]
pub fn form_csrf_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    if !content_type.starts_with("application/x-www-form-urlencoded") {
        return None;
    }
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key.as_ref() == CSRF_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Double-submit CSRF check for state-changing requests.
///
/// Safe methods pass without inspection. For everything else a token must be
/// presented in the `X-CSRF-Token` header (or, failing that, the caller's
/// extracted `csrf_token` form field), equal the `csrf_token` cookie, and be
/// live in the registry for this principal. A registry outage rejects the
/// request.
///
/// # Errors
/// Returns `Forbidden` on any mismatch or when the registry cannot be
/// queried.
pub async fn enforce_csrf(
    method: &Method,
    headers: &HeaderMap,
    form_token: Option<&str>,
    state: &AuthState,
    principal: &Principal,
) -> Result<(), AuthError> {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(());
    }

    // Header wins; the form field only backs up form posts without one.
    let presented = headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| {
            form_token
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        });
    let Some(presented) = presented else {
        return Err(AuthError::Forbidden("CSRF token missing".to_string()));
    };

    let Some(cookie_token) = extract_cookie(headers, CSRF_COOKIE) else {
        return Err(AuthError::Forbidden("CSRF token missing".to_string()));
    };
    if presented != cookie_token {
        return Err(AuthError::Forbidden("CSRF token mismatch".to_string()));
    }

    let live = state
        .csrf()
        .verify(&presented, &principal.id)
        .await
        .unwrap_or(false);
    if !live {
        return Err(AuthError::Forbidden("CSRF token invalid".to_string()));
    }
    Ok(())
}
