//! # gc-wireguard
//!
//! The WireGuard Reconciler (`spec.md` §4.8): key types, peer-set
//! configuration, the `WireGuardInterface` data-plane port, and the
//! reconciler that transforms a desired peer set into an idempotent batch
//! update against that port.
//!
//! ```rust
//! use gc_wireguard::{AllowedIp, FakeWireGuardInterface, InterfaceConfig, KeyPair, PrivateKey, Reconciler, WireGuardInterface, WireGuardPeer};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut iface = FakeWireGuardInterface::new();
//! let config = InterfaceConfig::new(PrivateKey::generate());
//! iface.create("gcwg0", &config).await.unwrap();
//!
//! let mut reconciler = Reconciler::new(iface, "gcwg0");
//! let peer = WireGuardPeer::new(*KeyPair::generate().public_key())
//!     .with_allowed_ip(AllowedIp::from_cidr("10.1.0.2/32").unwrap());
//! let outcome = reconciler.sync_peers(&[peer]).await.unwrap();
//! assert_eq!(outcome.added, 1);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod interface;
pub mod keys;
#[cfg(feature = "linux")]
pub mod linux;
pub mod reconciler;
pub mod types;

pub use config::{InterfaceConfig, InterfaceConfigBuilder, PeerConfig, PeerConfigBuilder};
pub use error::{Result, WireGuardError};
pub use interface::{FakeWireGuardInterface, InterfaceState, WireGuardInterface};
#[cfg(feature = "linux")]
pub use linux::LinuxWireGuardInterface;
pub use keys::{generate_keypair, KeyPair, PrivateKey, PublicKey, KEY_SIZE};
pub use reconciler::{Reconciler, ReconcilerStatus, SyncOutcome};
pub use types::{AllowedIp, Endpoint, InterfaceStatus, PeerStatus, PresharedKey, WireGuardPeer};
