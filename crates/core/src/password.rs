//! Password hashing for employee accounts (Argon2id, PHC string format).
//!
//! Argon2 is CPU-bound, so both operations run on the blocking thread pool.

use crate::{ClinicError, ClinicResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

pub async fn hash(password: &str) -> ClinicResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| ClinicError::PasswordHash(format!("task join error: {e}")))?
}

/// Check `password` against `stored_hash`.
///
/// With no stored hash (unknown or inactive account) the password is still checked against a
/// fixed dummy hash and `false` is returned, so every login attempt costs one verification.
/// An unparseable stored hash also yields `false`.
pub async fn verify(password: &str, stored_hash: Option<&str>) -> bool {
    let password = password.to_owned();
    let stored_hash = stored_hash.map(str::to_owned);
    let outcome = tokio::task::spawn_blocking(move || match stored_hash {
        Some(stored) => verify_blocking(&password, &stored),
        None => {
            if let Some(dummy) = dummy_hash() {
                verify_blocking(&password, dummy);
            }
            false
        }
    })
    .await;

    outcome.unwrap_or_else(|e| {
        tracing::error!("password verification task failed: {}", e);
        false
    })
}

fn hash_blocking(password: &str) -> ClinicResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ClinicError::PasswordHash(e.to_string()))
}

fn verify_blocking(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash could not be parsed: {}", e);
            false
        }
    }
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_blocking("no-such-account").ok())
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify() {
        let hashed = hash("correct horse").await.unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify("correct horse", Some(&hashed)).await);
        assert!(!verify("wrong horse", Some(&hashed)).await);
    }

    #[tokio::test]
    async fn garbage_hash_never_verifies() {
        assert!(!verify("anything", Some("not-a-phc-string")).await);
    }

    #[tokio::test]
    async fn missing_account_still_runs_a_verification() {
        assert!(!verify("no-such-account", None).await);
        assert!(dummy_hash().is_some_and(|h| h.starts_with("$argon2")));
    }
}
