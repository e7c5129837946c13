//! One-shot admin account reconciliation, run at startup.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::{info, warn};

use super::password::hash_password;
use super::storage::{insert_user, lookup_user_by_email, update_admin_flag, InsertOutcome};
use super::utils::normalize_email;

/// Bootstrap credentials supplied through CLI/env configuration.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub username: String,
    pub password: SecretString,
}

/// Reconcile the configured admin account.
///
/// Idempotent: an existing account gets its admin flag raised if needed; a
/// missing one is created. Runs once before the server accepts traffic, so
/// request handlers never carry bootstrap logic.
///
/// # Errors
/// Fails when the database is unreachable or the account cannot be created.
pub async fn ensure_admin_user(pool: &PgPool, bootstrap: &AdminBootstrap) -> Result<()> {
    let email = normalize_email(&bootstrap.email);

    if let Some(existing) = lookup_user_by_email(pool, &email).await? {
        if existing.is_admin {
            info!(email, "admin account already present");
        } else {
            update_admin_flag(pool, existing.id, true)
                .await
                .context("failed to raise admin flag")?;
            info!(email, "raised admin flag on existing account");
        }
        return Ok(());
    }

    let password_hash = hash_password(bootstrap.password.expose_secret())?;
    match insert_user(pool, &bootstrap.username, &email, &password_hash, None, true).await? {
        InsertOutcome::Created(record) => {
            info!(email, user_id = %record.id, "created admin account");
        }
        // Lost a race with another replica doing the same reconciliation.
        InsertOutcome::Conflict => {
            warn!(email, "admin account appeared concurrently, leaving it as-is");
        }
    }
    Ok(())
}
