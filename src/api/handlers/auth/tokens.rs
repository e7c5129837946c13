//! Token issuance, verification, rotation, and blacklisting.
//!
//! Two token classes, both HS256-signed claim sets:
//!
//! - **Access tokens** are stateless: nothing is stored server-side unless
//!   the token is explicitly blacklisted.
//! - **Refresh tokens** are registry-backed: `refresh_token:{user_id}` holds
//!   the single currently-valid refresh token string for that user. New
//!   issuance overwrites the entry, so at most one refresh token per user is
//!   live at any time and "logout all devices" is one key deletion.
//!
//! Verification paths fail closed: if the blacklist cannot be queried, the
//! token is rejected.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::principal::Principal;
use crate::kv::KvStore;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Signed claim set carried by both token classes.
///
/// `jti` makes every issuance a distinct string, so overwriting the refresh
/// registry actually supersedes the previous token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: String,
    #[serde(rename = "isAdmin", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl TokenClaims {
    fn new(user_id: &str, is_admin: Option<bool>, kind: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: user_id.to_string(),
            is_admin,
            kind,
            exp: now + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

fn registry_key(user_id: &str) -> String {
    format!("refresh_token:{user_id}")
}

fn blacklist_key(kind: TokenKind, token: &str) -> String {
    format!("blacklist:{}:{token}", kind.as_str())
}

/// Owns the `refresh_token:` and `blacklist:` namespaces in the KV store.
pub struct TokenVault {
    kv: Arc<dyn KvStore>,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenVault {
    #[must_use]
    pub fn new(
        kv: Arc<dyn KvStore>,
        access_secret: &SecretString,
        refresh_secret: &SecretString,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let access = access_secret.expose_secret().as_bytes();
        let refresh = refresh_secret.expose_secret().as_bytes();
        Self {
            kv,
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            access_ttl,
            refresh_ttl,
        }
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Mint a signed access token. Pure signing, no store I/O.
    ///
    /// # Errors
    /// Fails only on signing-key misconfiguration.
    pub fn issue_access_token(&self, user_id: &str, is_admin: bool) -> Result<String> {
        let claims = TokenClaims::new(user_id, Some(is_admin), TokenKind::Access, self.access_ttl);
        encode(&Header::default(), &claims, &self.access_encoding)
            .context("failed to sign access token")
    }

    /// Mint a signed refresh token and overwrite the user's registry entry.
    ///
    /// A registry write failure is logged and the token is still returned:
    /// the caller's sign-in succeeds, but the token will fail the registry
    /// match on first use and force a fresh sign-in.
    ///
    /// # Errors
    /// Fails only on signing-key misconfiguration.
    pub async fn issue_refresh_token(&self, user_id: &str) -> Result<String> {
        let claims = TokenClaims::new(user_id, None, TokenKind::Refresh, self.refresh_ttl);
        let token = encode(&Header::default(), &claims, &self.refresh_encoding)
            .context("failed to sign refresh token")?;
        if let Err(err) = self
            .kv
            .set(&registry_key(user_id), &token, self.refresh_ttl)
            .await
        {
            warn!(user_id, "failed to register refresh token: {err:#}");
        }
        Ok(token)
    }

    /// Verify an access token: blacklist, signature, expiry, then type.
    ///
    /// All failures, including an unreachable blacklist store, collapse to
    /// `None`.
    pub async fn verify_access_token(&self, token: &str) -> Option<Principal> {
        match self.is_blacklisted(token, TokenKind::Access).await {
            Ok(false) => {}
            Ok(true) => return None,
            Err(err) => {
                warn!("blacklist lookup failed, rejecting access token: {err:#}");
                return None;
            }
        }
        let claims = decode_claims(token, &self.access_decoding)?;
        if claims.kind != TokenKind::Access {
            return None;
        }
        Some(Principal {
            id: claims.id,
            is_admin: claims.is_admin.unwrap_or(false),
        })
    }

    /// Verify a refresh token and return the user id it belongs to.
    ///
    /// On top of the access-token checks, the presented string must equal
    /// the registry value exactly; a well-signed, unexpired token that has
    /// been superseded or revoked fails here.
    pub async fn verify_refresh_token(&self, token: &str) -> Option<String> {
        match self.is_blacklisted(token, TokenKind::Refresh).await {
            Ok(false) => {}
            Ok(true) => return None,
            Err(err) => {
                warn!("blacklist lookup failed, rejecting refresh token: {err:#}");
                return None;
            }
        }
        let claims = decode_claims(token, &self.refresh_decoding)?;
        if claims.kind != TokenKind::Refresh {
            return None;
        }
        let registered = match self.kv.get(&registry_key(&claims.id)).await {
            Ok(value) => value,
            Err(err) => {
                warn!("refresh registry lookup failed, rejecting token: {err:#}");
                return None;
            }
        };
        if registered.as_deref() != Some(token) {
            return None;
        }
        Some(claims.id)
    }

    /// Insert a token into the blacklist.
    ///
    /// The entry's TTL is the token's remaining lifetime, decoded from its
    /// own `exp` claim; an undecodable payload falls back to the kind's
    /// maximum lifetime. Absent or empty tokens are a no-op success.
    ///
    /// # Errors
    /// Returns an error when the KV write fails.
    pub async fn blacklist_token(&self, token: Option<&str>, kind: TokenKind) -> Result<bool> {
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return Ok(false);
        };
        let ttl = remaining_lifetime(token).unwrap_or(match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        });
        self.kv
            .set(&blacklist_key(kind, token), "blacklisted", ttl)
            .await?;
        Ok(true)
    }

    /// Delete the user's refresh-token registry entry.
    ///
    /// Every previously issued refresh token for the user fails the registry
    /// match afterwards.
    ///
    /// # Errors
    /// Returns an error when the KV delete fails.
    pub async fn revoke_refresh_token(&self, user_id: &str) -> Result<bool> {
        self.kv.delete(&registry_key(user_id)).await
    }

    /// Check blacklist membership, exposed for diagnostics.
    ///
    /// # Errors
    /// Returns an error when the KV store is unreachable; verification
    /// callers treat that as a rejection.
    pub async fn is_blacklisted(&self, token: &str, kind: TokenKind) -> Result<bool> {
        self.kv.exists(&blacklist_key(kind, token)).await
    }
}

fn decode_claims(token: &str, key: &DecodingKey) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<TokenClaims>(token, key, &validation)
        .map(|data| data.claims)
        .ok()
}

/// Decode the `exp` claim without signature verification and return the
/// seconds left until expiry. Used only to size blacklist TTLs; an already
/// expired token gets a 1-second entry.
fn remaining_lifetime(token: &str) -> Option<Duration> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = value.get("exp")?.as_i64()?;
    let left = exp - Utc::now().timestamp();
    Some(Duration::from_secs(u64::try_from(left).unwrap_or(0).max(1)))
}
