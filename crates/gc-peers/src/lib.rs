//! # gc-peers
//!
//! The Peer Provisioning Engine (`spec.md` §4.7): derives the Cartesian
//! set of `WireGuard` peer rows connecting every active device of every
//! approved member of a network, reacting to membership and device
//! lifecycle events from `gc-membership` and `gc-devices`.
//!
//! Per `spec.md` §9 ("MUST NOT store edge rows"), this crate stores one
//! row per (network, device) — never a peer-to-peer edge. The complete
//! graph view is derived at sync time by handing the full peer set to the
//! `gc-wireguard` reconciler.
//!
//! ```rust
//! use gc_peers::{DeviceKey, DeviceId, InMemoryPeerRepository, NetworkId, PeerProvisioningEngine, UserId};
//!
//! let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
//! let network_id = NetworkId::from_uuid(uuid::Uuid::new_v4());
//! let user_id = UserId::from_uuid(uuid::Uuid::new_v4());
//! let device = DeviceKey { device_id: DeviceId::from_uuid(uuid::Uuid::new_v4()), public_key: "PK1".into() };
//! let cidr = "10.1.0.0/24".parse().unwrap();
//!
//! let peers = engine.provision_user_in_network(network_id, user_id, &cidr, Some(25), &[device]).unwrap();
//! assert_eq!(peers.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod repository;
pub mod service;
pub mod types;

pub use error::{Error, Result};
pub use repository::{InMemoryPeerRepository, PeerRepository};
pub use service::PeerProvisioningEngine;
pub use types::{DeviceId, DeviceKey, DisabledReason, NetworkId, Peer, PeerId, UserId};
