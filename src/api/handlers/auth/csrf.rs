//! Double-submit CSRF tokens backed by the KV store.
//!
//! A CSRF token is 32 random bytes, URL-safe base64. For an authenticated
//! user the guard registers `csrf_token:{user_id}:{token}` with the CSRF TTL
//! and the value is mirrored to a readable cookie; verification checks
//! registry existence only, so a token stays valid for repeated requests
//! until it expires. Anonymous tokens are handed out but never registered:
//! they let the frontend warm up its cookie before sign-in, and they never
//! pass verification.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;

use crate::kv::KvStore;

fn registry_key(user_id: &str, token: &str) -> String {
    format!("csrf_token:{user_id}:{token}")
}

fn user_prefix(user_id: &str) -> String {
    format!("csrf_token:{user_id}:")
}

/// Owns the `csrf_token:` namespace in the KV store.
pub struct CsrfGuard {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl CsrfGuard {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Mint a random token. Registered only when a user id is given.
    ///
    /// # Errors
    /// Returns an error if random bytes cannot be drawn or the registry
    /// write fails.
    pub async fn generate(&self, user_id: Option<&str>) -> Result<String> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate csrf token")?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        if let Some(user_id) = user_id {
            self.kv
                .set(&registry_key(user_id, &token), "valid", self.ttl)
                .await
                .context("failed to register csrf token")?;
        }
        Ok(token)
    }

    /// Check whether `token` is live for `user_id`.
    ///
    /// Existence check only, the token is not consumed and verifies again
    /// within its TTL.
    ///
    /// # Errors
    /// Returns an error when the registry is unreachable; callers reject
    /// the request in that case.
    pub async fn verify(&self, token: &str, user_id: &str) -> Result<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        self.kv.exists(&registry_key(user_id, token)).await
    }

    /// Drop every live token for the user. Used on logout and rotation.
    ///
    /// # Errors
    /// Returns an error when the registry delete fails.
    pub async fn revoke_all(&self, user_id: &str) -> Result<bool> {
        let removed = self.kv.delete_prefix(&user_prefix(user_id)).await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKv;

    fn guard() -> CsrfGuard {
        CsrfGuard::new(Arc::new(InMemoryKv::new()), Duration::from_secs(900))
    }

    #[tokio::test]
    async fn registered_token_verifies_more_than_once() -> Result<()> {
        let guard = guard();
        let token = guard.generate(Some("user-1")).await?;
        assert!(guard.verify(&token, "user-1").await?);
        // Multi-use within TTL: a second verification still passes.
        assert!(guard.verify(&token, "user-1").await?);
        Ok(())
    }

    #[tokio::test]
    async fn token_is_scoped_to_its_user() -> Result<()> {
        let guard = guard();
        let token = guard.generate(Some("user-1")).await?;
        assert!(!guard.verify(&token, "user-2").await?);
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_token_is_not_registered() -> Result<()> {
        let guard = guard();
        let token = guard.generate(None).await?;
        assert!(!token.is_empty());
        assert!(!guard.verify(&token, "user-1").await?);
        Ok(())
    }

    #[tokio::test]
    async fn empty_token_never_verifies() -> Result<()> {
        let guard = guard();
        assert!(!guard.verify("", "user-1").await?);
        Ok(())
    }

    #[tokio::test]
    async fn revoke_all_clears_only_that_user() -> Result<()> {
        let guard = guard();
        let first = guard.generate(Some("user-1")).await?;
        let second = guard.generate(Some("user-1")).await?;
        let other = guard.generate(Some("user-2")).await?;

        assert!(guard.revoke_all("user-1").await?);
        assert!(!guard.verify(&first, "user-1").await?);
        assert!(!guard.verify(&second, "user-1").await?);
        assert!(guard.verify(&other, "user-2").await?);

        // Nothing left to revoke.
        assert!(!guard.revoke_all("user-1").await?);
        Ok(())
    }
}
