//! Cookie plumbing for the token pair and the CSRF mirror.
//!
//! Three cookies make up a browser session: `access_token` and
//! `refresh_token` are `HttpOnly`, `csrf_token` is readable so the frontend
//! can echo it back in the `X-CSRF-Token` header. All three are `Path=/`,
//! `SameSite=Lax`, and `Secure` when the frontend is served over HTTPS.

use anyhow::{Context, Result};
use axum::http::{
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

use super::state::{AuthConfig, AuthState};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const CSRF_COOKIE: &str = "csrf_token";

/// The three tokens minted for a browser session.
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
    pub csrf: String,
}

/// Mint a fresh access/refresh/CSRF trio for the user.
///
/// Issued together on sign-in, refresh, and federated sign-in so the cookies
/// always rotate as a set.
///
/// # Errors
/// Fails on signing-key misconfiguration or when the CSRF registry write
/// fails.
pub async fn issue_session(
    state: &AuthState,
    user_id: &str,
    is_admin: bool,
) -> Result<SessionTokens> {
    let access = state.tokens().issue_access_token(user_id, is_admin)?;
    let refresh = state.tokens().issue_refresh_token(user_id).await?;
    let csrf = state.csrf().generate(Some(user_id)).await?;
    Ok(SessionTokens {
        access,
        refresh,
        csrf,
    })
}

/// Append the session trio as `Set-Cookie` headers.
///
/// # Errors
/// Fails when a token contains bytes that cannot form a header value.
pub fn apply_session_cookies(
    headers: &mut HeaderMap,
    config: &AuthConfig,
    tokens: &SessionTokens,
) -> Result<()> {
    let access_ttl = config.access_ttl().as_secs();
    let refresh_ttl = config.refresh_ttl().as_secs();
    let csrf_ttl = config.csrf_ttl().as_secs();
    headers.append(
        SET_COOKIE,
        build_cookie(config, ACCESS_COOKIE, &tokens.access, access_ttl, true)?,
    );
    headers.append(
        SET_COOKIE,
        build_cookie(config, REFRESH_COOKIE, &tokens.refresh, refresh_ttl, true)?,
    );
    // Readable on purpose: the frontend mirrors it into X-CSRF-Token.
    headers.append(
        SET_COOKIE,
        build_cookie(config, CSRF_COOKIE, &tokens.csrf, csrf_ttl, false)?,
    );
    Ok(())
}

/// Append expired `Set-Cookie` headers for all three session cookies.
///
/// # Errors
/// Fails only when a header value cannot be built, which the fixed cookie
/// names never trigger in practice.
pub fn apply_clear_cookies(headers: &mut HeaderMap, config: &AuthConfig) -> Result<()> {
    headers.append(SET_COOKIE, build_cookie(config, ACCESS_COOKIE, "", 0, true)?);
    headers.append(
        SET_COOKIE,
        build_cookie(config, REFRESH_COOKIE, "", 0, true)?,
    );
    headers.append(SET_COOKIE, build_cookie(config, CSRF_COOKIE, "", 0, false)?);
    Ok(())
}

fn build_cookie(
    config: &AuthConfig,
    name: &str,
    value: &str,
    max_age: u64,
    http_only: bool,
) -> Result<HeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; SameSite=Lax; Max-Age={max_age}");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).context("failed to build session cookie")
}

/// Read a cookie value from the request headers.
#[must_use]
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        // Pairs without '=' are skipped, not treated as a parse failure.
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        let val = val.trim();
        if key.trim() == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Read a bearer token from the `Authorization` header.
#[must_use]
pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Access token from either transport, bearer header first.
#[must_use]
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer(headers).or_else(|| extract_cookie(headers, ACCESS_COOKIE))
}
