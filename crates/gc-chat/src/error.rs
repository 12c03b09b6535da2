//! Error types for the Chat Service.

use thiserror::Error;

/// Errors raised by [`crate::service::ChatService`].
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced message does not exist, is soft-deleted, or belongs to
    /// another tenant (tenant mismatch rewritten to this, `spec.md` §7).
    #[error("not found")]
    NotFound,

    /// The actor lacks authorship or the moderator+ role required.
    #[error("forbidden")]
    Forbidden,

    /// Malformed request: empty scope/body, or body over the byte limit.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

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
            Self::Internal { .. } => "InternalServer",
        }
    }
}

/// Result type alias for chat operations.
pub type Result<T> = std::result::Result<T, Error>;
