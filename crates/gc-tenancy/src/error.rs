//! Error types for the tenant service.

use thiserror::Error;

/// Errors raised by [`crate::service::TenantService`] and its collaborators.
///
/// Variants map onto the domain error codes in `spec.md` §6/§7;
/// [`Error::code`] returns the stable wire string.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced tenant, membership, invite, or announcement does not
    /// exist, or exists in another tenant (existence is never leaked
    /// across a tenant boundary).
    #[error("not found")]
    NotFound,

    /// The actor's role does not permit the requested operation, or a
    /// join would exceed `max_members`.
    #[error("forbidden")]
    Forbidden,

    /// Wrong or absent tenant password on a `password`-policy join.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Malformed input: bad pagination cursor, invalid enum value, name
    /// too long, or a join policy requiring a token/password was called
    /// without one.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// The target user is already banned from the tenant.
    #[error("user is banned")]
    UserBanned,

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
            Self::InvalidCredentials => "InvalidCredentials",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::UserBanned => "UserBanned",
            Self::IdempotencyConflict => "IdempotencyConflict",
            Self::Internal { .. } => "InternalServer",
        }
    }
}

/// Result type alias for tenant-service operations.
pub type Result<T> = std::result::Result<T, Error>;
