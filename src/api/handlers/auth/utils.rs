//! Small shared helpers for the auth handlers.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static EMAIL_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(super) fn valid_email(email: &str) -> bool {
    EMAIL_REGEX
        .as_ref()
        .is_some_and(|regex| regex.is_match(email))
}

/// Derive a username candidate from a display name: lowercase, spaces
/// stripped, plus four random digits to dodge collisions.
pub(super) fn derive_username(name: &str) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let base = if base.is_empty() {
        "user".to_string()
    } else {
        base
    };
    let suffix = rand::thread_rng().gen_range(0..10_000);
    format!("{base}{suffix:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_basics() {
        assert!(valid_email("alice@example.com"));
        assert!(valid_email("a.b+c@sub.example.org"));
        assert!(!valid_email("alice"));
        assert!(!valid_email("alice@"));
        assert!(!valid_email("alice@example"));
        assert!(!valid_email("a lice@example.com"));
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn derived_username_is_lowercase_with_digit_suffix() {
        let username = derive_username("Alice Doe");
        assert!(username.starts_with("alicedoe"));
        assert_eq!(username.len(), "alicedoe".len() + 4);
        assert!(username[username.len() - 4..]
            .chars()
            .all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn empty_name_falls_back_to_user() {
        let username = derive_username("   ");
        assert!(username.starts_with("user"));
    }
}
