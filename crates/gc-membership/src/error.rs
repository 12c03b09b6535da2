//! Error types for the membership engine.

use thiserror::Error;

/// Errors raised by [`crate::service::MembershipService`].
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced network does not exist, or belongs to another tenant;
    /// tenant mismatch is always rewritten to this (`spec.md` §7).
    #[error("not found")]
    NotFound,

    /// The actor does not hold the role required for the operation.
    #[error("forbidden")]
    Forbidden,

    /// Malformed request: empty idempotency key, missing invite token, etc.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// The caller already has a pending join request for this network.
    #[error("a join request is already pending")]
    AlreadyRequested,

    /// The caller is banned from this network.
    #[error("user is banned from this network")]
    UserBanned,

    /// The invite token is expired, revoked, or exhausted.
    #[error("invite token expired or exhausted")]
    InviteTokenExpired,

    /// A mutation was retried with the same idempotency key but a
    /// different request fingerprint.
    #[error("idempotency conflict")]
    IdempotencyConflict,

    /// An underlying storage primitive failed unexpectedly.
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
            Self::NotFound => "NotFound",
            Self::Forbidden => "Forbidden",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::AlreadyRequested => "AlreadyRequested",
            Self::UserBanned => "UserBanned",
            Self::InviteTokenExpired => "InviteTokenExpired",
            Self::IdempotencyConflict => "IdempotencyConflict",
            Self::Internal { .. } => "InternalServer",
        }
    }
}

/// Result type alias for membership operations.
pub type Result<T> = std::result::Result<T, Error>;
