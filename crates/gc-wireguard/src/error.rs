//! Error types for WireGuard key handling, peer-set configuration, and
//! interface/reconciler operations.

use thiserror::Error;

/// Errors that can occur during WireGuard key, config, and interface
/// operations.
#[derive(Debug, Error)]
pub enum WireGuardError {
    /// Invalid key format.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid base64 encoding.
    #[error("invalid base64 encoding: {0}")]
    InvalidBase64(String),

    /// Invalid key length.
    #[error("invalid key length: expected 32, got {0}")]
    InvalidKeyLength(usize),

    /// Malformed CIDR in an `AllowedIp`.
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Malformed `host:port` endpoint.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A textual `wg`-style config section/line could not be parsed.
    #[error("parse error at line {line}: {message}")]
    ParseError {
        /// 1-based line number within the config text.
        line: usize,
        /// Human-readable detail.
        message: String,
    },

    /// A required config field (private key, public key) was absent when
    /// building a concrete value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// An interface was created twice.
    #[error("interface already exists: {0}")]
    InterfaceExists(String),

    /// An operation referenced an interface that is not managed.
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    /// A peer was added twice to the same interface.
    #[error("peer already exists: {0}")]
    PeerExists(String),

    /// An operation referenced a peer not present on the interface.
    #[error("peer not found: {0}")]
    PeerNotFound(String),

    /// The underlying kernel/userspace WireGuard backend returned an error.
    #[error("interface error: {0}")]
    InterfaceError(String),
}

/// Result type alias for WireGuard operations.
pub type Result<T> = std::result::Result<T, WireGuardError>;
