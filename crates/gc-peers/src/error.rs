//! Error types for the Peer Provisioning Engine.

use thiserror::Error;

/// Errors raised by [`crate::service::PeerProvisioningEngine`].
#[derive(Debug, Error)]
pub enum Error {
    /// The network's address pool has no free addresses left (propagated
    /// from `gc_network::Ipam`).
    #[error("no addresses available in network")]
    NoAddressesAvailable,

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
            Self::NoAddressesAvailable => "NoAddressesAvailable",
            Self::Internal { .. } => "InternalServer",
        }
    }
}

impl From<gc_network::Error> for Error {
    fn from(err: gc_network::Error) -> Self {
        match err {
            gc_network::Error::NoAddressesAvailable => Self::NoAddressesAvailable,
            other => Self::Internal { reason: other.to_string() },
        }
    }
}

/// Result type alias for peer-provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;
