//! Error types for the idempotency store.

use thiserror::Error;

/// Errors that can occur when recording or replaying an idempotent call.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// The same key was reused with a different request fingerprint.
    #[error("idempotency key {key} was already used with a different request")]
    Conflict {
        /// The key that was replayed with a mismatched fingerprint.
        key: String,
    },

    /// The stored response could not be deserialized back into the
    /// caller's expected type.
    #[error("stored response for key {key} could not be decoded: {reason}")]
    Corrupt {
        /// The key whose stored response is unreadable.
        key: String,
        /// Why decoding failed.
        reason: String,
    },
}

/// Result type alias for idempotency operations.
pub type Result<T> = std::result::Result<T, IdempotencyError>;
