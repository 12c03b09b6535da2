//! Tenant join-password hashing.
//!
//! Duplicated in shape from `gc-auth::password` rather than shared, to
//! keep this crate's dependency graph free of `gc-auth` (`SPEC_FULL.md`
//! crate-decoupling note); both use the same Argon2id primitive the spec
//! mandates for credential storage (`spec.md` §4.1).

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Hash a tenant join password with Argon2id under a fresh random salt.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the underlying hasher fails.
pub fn hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal { reason: format!("argon2 hash: {e}") })
}

/// Verify a presented password against a previously computed hash.
#[must_use]
pub fn verify(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_round_trips() {
        let h = hash("tenant-join-password").unwrap();
        assert!(verify("tenant-join-password", &h));
        assert!(!verify("wrong", &h));
    }

    #[test]
    fn malformed_hash_fails_closed() {
        assert!(!verify("anything", "garbage"));
    }
}
