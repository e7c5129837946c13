//! Password hashing and the sign-up password policy.

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// OWASP minimum Argon2id params: m=19456 KiB, t=2 iterations, p=1 thread.
fn argon2_instance() -> Result<Argon2<'static>> {
    let params =
        Params::new(19_456, 2, 1, None).map_err(|err| anyhow!("invalid argon2 params: {err}"))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash a password with a fresh random salt.
///
/// # Errors
/// Returns an error when hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2_instance()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Constant-time verification against a stored hash.
/// Params are read from the hash itself, so older hashes keep verifying.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Result of checking a candidate password against the policy.
#[derive(Debug, Serialize, ToSchema)]
pub struct PasswordCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub score: u8,
    pub strength: &'static str,
}

/// Check the sign-up policy: 8+ characters, one uppercase, one lowercase,
/// one number, one special character. Each unmet rule contributes an error
/// message; score counts the met rules.
#[must_use]
pub fn validate_password(password: &str) -> PasswordCheck {
    if password.is_empty() {
        return PasswordCheck {
            is_valid: false,
            errors: vec!["Password is required".to_string()],
            score: 0,
            strength: "weak",
        };
    }

    let mut errors = Vec::new();
    let mut score = 0u8;

    let rules: [(&str, bool); 5] = [
        ("At least 8 characters", password.chars().count() >= 8),
        (
            "One uppercase letter",
            password.chars().any(|c| c.is_ascii_uppercase()),
        ),
        (
            "One lowercase letter",
            password.chars().any(|c| c.is_ascii_lowercase()),
        ),
        ("One number", password.chars().any(|c| c.is_ascii_digit())),
        (
            "One special character",
            password.chars().any(|c| SPECIAL_CHARS.contains(c)),
        ),
    ];

    for (message, met) in rules {
        if met {
            score += 1;
        } else {
            errors.push(message.to_string());
        }
    }

    let strength = match score {
        5 => "strong",
        4 => "medium",
        _ => "weak",
    };

    PasswordCheck {
        is_valid: errors.is_empty(),
        errors,
        score,
        strength,
    }
}

/// Generate a random password that satisfies the policy.
///
/// Used for federated accounts, where the password is never surfaced to the
/// user and only exists to fill the credential record.
#[must_use]
pub fn generate_strong_password() -> String {
    let mut rng = rand::thread_rng();

    let uppercase: Vec<char> = ('A'..='Z').collect();
    let lowercase: Vec<char> = ('a'..='z').collect();
    let digits: Vec<char> = ('0'..='9').collect();
    let special: Vec<char> = "!@#$%^&*()".chars().collect();

    // One of each class, then fill to 8-12 characters and shuffle.
    let mut password = vec![
        uppercase[rng.gen_range(0..uppercase.len())],
        lowercase[rng.gen_range(0..lowercase.len())],
        digits[rng.gen_range(0..digits.len())],
        special[rng.gen_range(0..special.len())],
    ];

    let all: Vec<char> = uppercase
        .into_iter()
        .chain(lowercase)
        .chain(digits)
        .chain(special)
        .collect();
    let remaining = rng.gen_range(4..=8);
    for _ in 0..remaining {
        password.push(all[rng.gen_range(0..all.len())]);
    }

    password.shuffle(&mut rng);
    password.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() -> Result<()> {
        let hash = hash_password("Abcdef1!")?;
        assert!(verify_password("Abcdef1!", &hash));
        assert!(!verify_password("Abcdef1?", &hash));
        Ok(())
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(!verify_password("Abcdef1!", "not-a-phc-string"));
    }

    #[test]
    fn short_password_cites_every_unmet_rule() {
        let check = validate_password("abc");
        assert!(!check.is_valid);
        assert_eq!(check.score, 1);
        assert_eq!(check.strength, "weak");
        for rule in [
            "At least 8 characters",
            "One uppercase letter",
            "One number",
            "One special character",
        ] {
            assert!(check.errors.iter().any(|e| e == rule), "missing: {rule}");
        }
    }

    #[test]
    fn policy_accepts_compliant_password() {
        let check = validate_password("Abcdef1!");
        assert!(check.is_valid);
        assert_eq!(check.score, 5);
        assert_eq!(check.strength, "strong");
        assert!(check.errors.is_empty());
    }

    #[test]
    fn empty_password_is_required() {
        let check = validate_password("");
        assert!(!check.is_valid);
        assert_eq!(check.errors, vec!["Password is required".to_string()]);
    }

    #[test]
    fn generated_passwords_pass_the_policy() {
        for _ in 0..20 {
            let password = generate_strong_password();
            let check = validate_password(&password);
            assert!(check.is_valid, "generated password failed: {password}");
            assert!((8..=12).contains(&password.chars().count()));
        }
    }
}
