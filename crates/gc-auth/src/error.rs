//! Error types for the identity and token service.

use thiserror::Error;

/// Errors raised by [`crate::service::AuthService`] and its collaborators.
///
/// Variants map onto the domain error codes in `spec.md` §6; [`Error::code`]
/// returns the stable wire string so `gc-server` can build the error
/// envelope without re-deriving it from the `Display` message.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown email, wrong password, or a bad recovery/TOTP code.
    /// Deliberately indistinguishable from "unknown user" to callers.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account is suspended.
    #[error("account suspended")]
    Forbidden,

    /// 2FA is enabled and no TOTP code was presented.
    #[error("two-factor authentication required")]
    TwoFactorRequired,

    /// Password does not meet the minimum strength policy.
    #[error("password does not meet minimum strength requirements")]
    WeakPassword,

    /// Registration attempted with an email already in use.
    #[error("email already registered")]
    EmailAlreadyExists,

    /// A presented token failed signature, type, expiry, or blacklist checks.
    #[error("invalid token: {reason}")]
    InvalidToken {
        /// Human-readable reason, never echoed to the end user verbatim.
        reason: String,
    },

    /// The principal is not authenticated at all.
    #[error("unauthorized")]
    Unauthorized,

    /// Referenced user/device-flow/OIDC state does not exist.
    #[error("not found")]
    NotFound,

    /// Malformed request (bad TOTP secret, bad recovery code format, ...).
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// OIDC is not configured for this deployment.
    #[error("oidc is not configured")]
    OidcDisabled,

    /// The OIDC provider rejected the authorization code or returned an
    /// unexpected response.
    #[error("oidc exchange failed: {reason}")]
    OidcExchangeFailed {
        /// Provider-reported or transport-level failure reason.
        reason: String,
    },

    /// Device-code flow: approval is still pending.
    #[error("authorization_pending")]
    AuthorizationPending,

    /// Device-code flow: the device code's TTL elapsed before approval.
    #[error("expired_token")]
    ExpiredToken,

    /// An underlying storage or crypto primitive failed unexpectedly.
    #[error("internal error: {reason}")]
    Internal {
        /// Internal detail, logged but never surfaced to the end user.
        reason: String,
    },
}

impl Error {
    /// Stable error code for the `{code, message, details?}` envelope.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "InvalidCredentials",
            Self::Forbidden => "Forbidden",
            Self::TwoFactorRequired => "TwoFactorRequired",
            Self::WeakPassword => "WeakPassword",
            Self::EmailAlreadyExists => "EmailAlreadyExists",
            Self::InvalidToken { .. } => "InvalidToken",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "NotFound",
            Self::InvalidRequest { .. } | Self::OidcDisabled | Self::OidcExchangeFailed { .. } => {
                "InvalidRequest"
            }
            Self::AuthorizationPending => "AuthorizationPending",
            Self::ExpiredToken => "ExpiredToken",
            Self::Internal { .. } => "InternalServer",
        }
    }
}

/// Result type alias for identity/token operations.
pub type Result<T> = std::result::Result<T, Error>;
