//! Top-level error type unifying every constituent crate's error.

use thiserror::Error;

/// Errors surfaced by the composition root and WebSocket gateway.
///
/// Every constituent crate defines its own error with a `code()` method;
/// this type wraps each one rather than re-deriving the mapping, so the
/// `{code, message, details?}` envelope (`spec.md` §6) stays in exactly
/// one place per crate.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Identity and token service failure.
    #[error(transparent)]
    Auth(#[from] gc_auth::Error),

    /// Tenant service failure.
    #[error(transparent)]
    Tenancy(#[from] gc_tenancy::Error),

    /// Network service / IPAM failure.
    #[error(transparent)]
    Network(#[from] gc_network::Error),

    /// Membership engine failure.
    #[error(transparent)]
    Membership(#[from] gc_membership::Error),

    /// Device service failure.
    #[error(transparent)]
    Devices(#[from] gc_devices::Error),

    /// Peer provisioning engine failure.
    #[error(transparent)]
    Peers(#[from] gc_peers::Error),

    /// WireGuard reconciler / data-plane failure.
    #[error(transparent)]
    WireGuard(#[from] gc_wireguard::WireGuardError),

    /// Chat service failure.
    #[error(transparent)]
    Chat(#[from] gc_chat::Error),

    /// Real-time event bus failure.
    #[error(transparent)]
    Events(#[from] gc_events::Error),

    /// Failed to bind the WebSocket listener.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// The request carried no usable bearer token.
    #[error("missing or malformed bearer token")]
    Unauthorized,
}

impl ServerError {
    /// Stable error code for the `{code, message, details?}` envelope
    /// (`spec.md` §6). Delegates to the wrapped crate's own `code()`
    /// where one exists.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.code(),
            Self::Tenancy(e) => e.code(),
            Self::Network(e) => e.code(),
            Self::Membership(e) => e.code(),
            Self::Devices(e) => e.code(),
            Self::Peers(e) => e.code(),
            Self::WireGuard(_) => "InternalServer",
            Self::Chat(e) => e.code(),
            Self::Events(e) => e.code(),
            Self::BindFailed(..) => "InternalServer",
            Self::Unauthorized => "Unauthorized",
        }
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
