//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let redis_url = matches
        .get_one::<String>("redis-url")
        .cloned()
        .context("missing required argument: --redis-url")?;
    let access_secret = matches
        .get_one::<String>("access-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --access-secret")?;
    let refresh_secret = matches
        .get_one::<String>("refresh-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --refresh-secret")?;

    let get = |name: &str| matches.get_one::<String>(name).cloned();

    Ok(Action::Server(Box::new(server::Args {
        port,
        dsn,
        redis_url,
        access_secret,
        refresh_secret,
        access_expiry: get("access-expiry").unwrap_or_else(|| "15m".to_string()),
        refresh_expiry: get("refresh-expiry").unwrap_or_else(|| "7d".to_string()),
        frontend_base_url: get("frontend-url")
            .unwrap_or_else(|| "http://localhost:5173".to_string()),
        admin_email: get("admin-email"),
        admin_username: get("admin-username"),
        admin_password: get("admin-password").map(SecretString::from),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn full_env_produces_server_action() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_PORT", Some("9090")),
                ("GATEHOUSE_DSN", Some("postgres://localhost:5432/gatehouse")),
                ("GATEHOUSE_REDIS_URL", Some("redis://127.0.0.1:6379")),
                ("GATEHOUSE_ACCESS_SECRET", Some("access-secret")),
                ("GATEHOUSE_REFRESH_SECRET", Some("refresh-secret")),
                ("GATEHOUSE_ACCESS_EXPIRY", Some("30m")),
                ("GATEHOUSE_FRONTEND_URL", Some("https://blog.example")),
                ("GATEHOUSE_ADMIN_EMAIL", Some("admin@blog.example")),
                ("GATEHOUSE_ADMIN_USERNAME", Some("admin")),
                ("GATEHOUSE_ADMIN_PASSWORD", Some("Sup3r$ecret")),
            ],
            || {
                let matches = crate::cli::commands::new()
                    .try_get_matches_from(vec!["gatehouse"])
                    .expect("env should satisfy required args");
                let Action::Server(args) = handler(&matches).expect("handler should succeed");
                assert_eq!(args.port, 9090);
                assert_eq!(args.redis_url, "redis://127.0.0.1:6379");
                assert_eq!(args.access_secret.expose_secret(), "access-secret");
                assert_eq!(args.access_expiry, "30m");
                assert_eq!(args.refresh_expiry, "7d");
                assert_eq!(args.frontend_base_url, "https://blog.example");
                assert_eq!(args.admin_email.as_deref(), Some("admin@blog.example"));
                assert!(args.admin_password.is_some());
            },
        );
    }

    #[test]
    fn admin_bootstrap_is_optional() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_DSN", Some("postgres://localhost:5432/gatehouse")),
                ("GATEHOUSE_REDIS_URL", Some("redis://127.0.0.1:6379")),
                ("GATEHOUSE_ACCESS_SECRET", Some("access")),
                ("GATEHOUSE_REFRESH_SECRET", Some("refresh")),
                ("GATEHOUSE_ADMIN_EMAIL", None::<&str>),
            ],
            || {
                let matches = crate::cli::commands::new()
                    .try_get_matches_from(vec!["gatehouse"])
                    .expect("env should satisfy required args");
                let Action::Server(args) = handler(&matches).expect("handler should succeed");
                assert!(args.admin_email.is_none());
                assert!(args.admin_username.is_none());
                assert!(args.admin_password.is_none());
            },
        );
    }
}
