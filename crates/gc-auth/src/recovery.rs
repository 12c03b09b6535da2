//! TOTP recovery codes: one-shot fallback credentials for 2FA-enabled
//! accounts that have lost access to their authenticator.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::password;

/// Alphabet recovery codes are drawn from: uppercase letters and digits
/// with visually ambiguous characters (`I`, `O`, `0`, `1`) removed.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GROUP_LEN: usize = 5;
const NUM_CODES: usize = 10;

/// Generate a fresh batch of plaintext recovery codes in `XXXXX-XXXXX`
/// form. Callers must hash each with [`hash`] before persisting and return
/// the plaintext to the user exactly once.
#[must_use]
pub fn generate_codes() -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..NUM_CODES).map(|_| generate_one(&mut rng)).collect()
}

fn group(rng: &mut impl Rng) -> String {
    (0..GROUP_LEN).map(|_| *ALPHABET.choose(rng).expect("alphabet is non-empty") as char).collect()
}

fn generate_one(rng: &mut impl Rng) -> String {
    format!("{}-{}", group(rng), group(rng))
}

/// Normalize user input before comparison: strip dashes/whitespace, then
/// uppercase. `xxxxx xxxxx`, `XXXXX-XXXXX`, and `xxxxxxxxxx` all normalize
/// identically.
#[must_use]
pub fn normalize(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>().to_uppercase()
}

/// Hash a normalized recovery code for storage, using the same Argon2id
/// primitive as password hashing.
///
/// # Errors
///
/// Propagates [`crate::error::Error::Internal`] on hasher failure.
pub fn hash(code: &str) -> crate::error::Result<String> {
    password::hash(&normalize(code))
}

/// Check `presented` (raw user input, not yet normalized) against a set of
/// stored hashes. Returns the index of the first matching hash, so the
/// caller can remove it atomically to enforce single use.
#[must_use]
pub fn find_match(presented: &str, stored_hashes: &[String]) -> Option<usize> {
    let normalized = normalize(presented);
    stored_hashes.iter().position(|h| password::verify(&normalized, h))
}
