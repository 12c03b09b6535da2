//! Password hashing and strength policy.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Minimum acceptable password length (`spec.md` §4.1).
pub const MIN_PASSWORD_LEN: usize = 8;

/// Reject passwords that fail the minimum strength policy.
///
/// # Errors
///
/// Returns [`Error::WeakPassword`] if `password` is shorter than
/// [`MIN_PASSWORD_LEN`].
pub fn check_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::WeakPassword);
    }
    Ok(())
}

/// Hash `password` with Argon2id under a fresh random salt.
///
/// Two calls with the same plaintext produce different hashes, since each
/// embeds its own salt and the Argon2 parameters.
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

/// Verify `password` against a previously computed Argon2id `hash`.
///
/// Verification itself is constant-time on the derived key (Argon2's
/// built-in comparison); this function does not leak timing beyond that.
#[must_use]
pub fn verify(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}
