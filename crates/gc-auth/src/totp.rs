//! TOTP (RFC 6238) second-factor secrets and verification.

use rand::RngCore;
use totp_lite::{totp_custom, Sha1};

use crate::error::{Error, Result};

const SECRET_BYTES: usize = 20;
const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;
/// Number of adjacent time steps accepted on either side of "now", to
/// tolerate clock drift between server and authenticator app.
const ALLOWED_SKEW_STEPS: i64 = 1;

/// Generate a fresh random TOTP secret, base32-encoded for display in a
/// provisioning URI / QR code.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes)
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret)
        .ok_or_else(|| Error::InvalidRequest { reason: "malformed TOTP secret".into() })
}

/// Compute the `otpauth://totp/...` provisioning URI for a secret, for
/// display as a QR code to the user enrolling 2FA.
#[must_use]
pub fn provisioning_uri(secret: &str, account_email: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{account_email}?secret={secret}&issuer={issuer}&algorithm=SHA1&digits={DIGITS}&period={STEP_SECONDS}"
    )
}

fn code_at(secret_bytes: &[u8], unix_time: u64) -> String {
    totp_custom::<Sha1>(STEP_SECONDS, DIGITS, secret_bytes, unix_time)
}

/// Compute the current code for `secret` at `unix_time`. Exposed for
/// callers (2FA enrollment flows, tests) that need to display or assert
/// against a code without going through [`verify`].
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] if `secret` is not valid base32.
pub fn current_code(secret: &str, unix_time: u64) -> Result<String> {
    let secret_bytes = decode_secret(secret)?;
    Ok(code_at(&secret_bytes, unix_time - (unix_time % STEP_SECONDS)))
}

/// Verify a user-presented TOTP `code` against `secret` at `unix_time`,
/// tolerating [`ALLOWED_SKEW_STEPS`] of clock drift in either direction.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] if `secret` is not valid base32.
pub fn verify(secret: &str, code: &str, unix_time: u64) -> Result<bool> {
    let secret_bytes = decode_secret(secret)?;
    let step = unix_time / STEP_SECONDS;
    for skew in -ALLOWED_SKEW_STEPS..=ALLOWED_SKEW_STEPS {
        let candidate_step = step as i64 + skew;
        if candidate_step < 0 {
            continue;
        }
        let candidate_time = candidate_step as u64 * STEP_SECONDS;
        if code_at(&secret_bytes, candidate_time) == code {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_round_trips_through_base32() {
        let secret = generate_secret();
        assert!(decode_secret(&secret).is_ok());
    }

    #[test]
    fn code_verifies_at_exact_step() {
        let secret = generate_secret();
        let secret_bytes = decode_secret(&secret).unwrap();
        let now = 1_700_000_000u64;
        let code = code_at(&secret_bytes, now - (now % STEP_SECONDS));
        assert!(verify(&secret, &code, now).unwrap());
    }

    #[test]
    fn wrong_code_is_rejected() {
        let secret = generate_secret();
        assert!(!verify(&secret, "000000", 1_700_000_000).unwrap());
    }

    #[test]
    fn malformed_secret_is_invalid_request() {
        let err = verify("not base32!!", "000000", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }
}
