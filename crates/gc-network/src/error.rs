//! Error types for the network service and IPAM.

use thiserror::Error;

/// Errors raised by [`crate::service::NetworkService`] and [`crate::ipam::Ipam`].
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced network does not exist, or belongs to another tenant
    /// (tenant mismatch is always rewritten to this, never leaked as a
    /// distinct error; `spec.md` §7).
    #[error("not found")]
    NotFound,

    /// The actor does not hold the role required for the operation.
    #[error("forbidden")]
    Forbidden,

    /// Malformed request: bad name length, invalid enum field, or a
    /// syntactically malformed CIDR string.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// CIDR string failed to parse as an IPv4 network.
    #[error("invalid CIDR: {reason}")]
    CidrInvalid {
        /// Parse failure detail.
        reason: String,
    },

    /// The requested CIDR overlaps an existing network's CIDR within the
    /// same tenant.
    #[error("CIDR overlaps an existing network in this tenant")]
    CidrOverlap,

    /// A mutation was retried with the same idempotency key but a
    /// different request fingerprint.
    #[error("idempotency conflict")]
    IdempotencyConflict,

    /// The network's address pool has no free addresses left.
    #[error("no addresses available in network")]
    NoAddressesAvailable,

    /// The address is not a member of the network's CIDR.
    #[error("address is not in the network's pool")]
    AddressNotInPool,

    /// The address is already leased to a device in this network.
    #[error("address is already allocated")]
    AddressAlreadyAllocated,

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
            Self::CidrInvalid { .. } => "CIDRInvalid",
            Self::CidrOverlap => "CIDROverlap",
            Self::IdempotencyConflict => "IdempotencyConflict",
            Self::NoAddressesAvailable => "NoAddressesAvailable",
            Self::AddressNotInPool => "AddressNotInPool",
            Self::AddressAlreadyAllocated => "AddressAlreadyAllocated",
            Self::Internal { .. } => "InternalServer",
        }
    }
}

/// Result type alias for network-service and IPAM operations.
pub type Result<T> = std::result::Result<T, Error>;
