//! Event bus error taxonomy.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors the event bus can surface, mapped to `spec.md` §6 error codes
/// via [`Error::code`].
#[derive(Debug, Error)]
pub enum Error {
    /// The caller is not an approved member of the target room.
    #[error("forbidden: not a member of the target room")]
    Forbidden,
    /// A malformed inbound frame (bad JSON, unknown room, oversized payload).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Unexpected failure (channel closed, serialization bug).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The stable machine-readable error code (`spec.md` §6).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Forbidden => "Forbidden",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Internal(_) => "InternalServer",
        }
    }
}
