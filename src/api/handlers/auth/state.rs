//! Auth configuration and shared state.

use regex::Regex;
use std::time::Duration;

use super::csrf::CsrfGuard;
use super::tokens::TokenVault;

const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Parse a token lifetime expression like `15m`, `12h`, or `7d`.
///
/// Unparseable expressions fall back to 7 days.
#[must_use]
pub fn parse_expiry(expression: &str) -> Duration {
    let Ok(regex) = Regex::new(r"^(\d+)([mhd])$") else {
        return DEFAULT_REFRESH_TTL;
    };
    let lowered = expression.trim().to_lowercase();
    let Some(captures) = regex.captures(&lowered) else {
        return DEFAULT_REFRESH_TTL;
    };
    let Ok(value) = captures[1].parse::<u64>() else {
        return DEFAULT_REFRESH_TTL;
    };
    match &captures[2] {
        "m" => Duration::from_secs(value * 60),
        "h" => Duration::from_secs(value * 60 * 60),
        _ => Duration::from_secs(value * 24 * 60 * 60),
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }

    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// CSRF registry entries and cookies share the access-token lifetime.
    #[must_use]
    pub fn csrf_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(super) fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Shared auth state injected into handlers.
///
/// The token vault and CSRF guard each own their KV namespace; they share the
/// underlying store handle but never touch each other's keys.
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenVault,
    csrf: CsrfGuard,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, tokens: TokenVault, csrf: CsrfGuard) -> Self {
        Self {
            config,
            tokens,
            csrf,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenVault {
        &self.tokens
    }

    #[must_use]
    pub fn csrf(&self) -> &CsrfGuard {
        &self.csrf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_expiry_units() {
        assert_eq!(parse_expiry("15m"), Duration::from_secs(15 * 60));
        assert_eq!(parse_expiry("12h"), Duration::from_secs(12 * 60 * 60));
        assert_eq!(parse_expiry("7d"), Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(parse_expiry("1D"), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn parse_expiry_falls_back_to_seven_days() {
        for garbage in ["", "15", "m15", "15s", "fifteen minutes", "7dd"] {
            assert_eq!(parse_expiry(garbage), DEFAULT_REFRESH_TTL, "{garbage}");
        }
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://blog.example".to_string());
        assert_eq!(config.access_ttl(), DEFAULT_ACCESS_TTL);
        assert_eq!(config.refresh_ttl(), DEFAULT_REFRESH_TTL);
        assert_eq!(config.csrf_ttl(), config.access_ttl());
        assert!(config.cookie_secure());

        let config = config
            .with_access_ttl(Duration::from_secs(60))
            .with_refresh_ttl(Duration::from_secs(120));
        assert_eq!(config.access_ttl(), Duration::from_secs(60));
        assert_eq!(config.csrf_ttl(), Duration::from_secs(60));
        assert_eq!(config.refresh_ttl(), Duration::from_secs(120));
    }

    #[test]
    fn cookie_secure_requires_https_frontend() {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        assert!(!config.cookie_secure());
    }
}
