//! Error types for the Device Service.

use thiserror::Error;

/// Errors raised by [`crate::service::DeviceService`].
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced device does not exist, or belongs to another
    /// user/tenant (never leaked as a distinct error; `spec.md` §7).
    #[error("not found")]
    NotFound,

    /// The actor does not own this device or its tenant does not match.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Why the request was rejected.
        reason: String,
    },

    /// Malformed request: bad platform, bad public key, empty name.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// The public key is already registered to another of the user's
    /// devices (`spec.md` §3: "public key unique within the user's
    /// devices").
    #[error("public key already registered to this user")]
    Conflict,

    /// `GetDeviceConfig` found no active peer for this device in any
    /// network (`spec.md` §4.5: "failure to find any peer yields an
    /// error, no blank config").
    #[error("device has no active peers in any network")]
    NoPeers,

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
            Self::Forbidden { .. } => "Forbidden",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::Conflict => "Conflict",
            Self::NoPeers => "NotFound",
            Self::Internal { .. } => "InternalServer",
        }
    }
}

/// Result type alias for device-service operations.
pub type Result<T> = std::result::Result<T, Error>;
