//! Core types for the Peer Provisioning Engine (`spec.md` §4.7).

use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reused directly from the Network Service rather than duplicated: a
/// peer's network id and a lease's network id must agree structurally on
/// every IPAM call, so this crate takes `gc_network::NetworkId` as its own
/// rather than define a second newtype over the same UUID (see
/// `DESIGN.md` crate-decoupling note for the Peer Provisioning Engine).
pub use gc_network::NetworkId;

/// Unique identifier for a user, local to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a device, local to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a peer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Create a new random `PeerId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a disabled peer row was disabled, so it is only ever re-enabled by
/// the matching lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisabledReason {
    /// The user was deprovisioned from the network (`spec.md` §4.4/§4.7);
    /// the address lease was released and must not be handed back out by
    /// [`crate::service::PeerProvisioningEngine::enable_device_peers`].
    Membership,
    /// The device itself was disabled (`spec.md` §4.5/§4.7); the lease is
    /// kept and re-enabling the device restores this exact row.
    Device,
}

/// A `WireGuard` peer provisioned for one device in one network
/// (`spec.md` §4.7; §9 "MUST NOT store edge rows" — this is a
/// device-in-network row, never a peer-to-peer edge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    /// Unique peer identifier.
    pub id: PeerId,
    /// The network this peer belongs to.
    pub network_id: NetworkId,
    /// The device this peer represents.
    pub device_id: DeviceId,
    /// The device's owning user (kept denormalized so membership-level
    /// bulk deprovisioning does not require a device lookup).
    pub user_id: UserId,
    /// The device's `WireGuard` public key at the time of provisioning.
    pub public_key: String,
    /// The IPAM-assigned overlay address.
    pub allowed_ip: Ipv4Addr,
    /// Keepalive interval advertised to the data plane, in seconds
    /// (`spec.md` §3: `persistent_keepalive`). `None` means "don't set".
    pub persistent_keepalive: Option<u16>,
    /// Last-known endpoint, if the data plane has observed one.
    pub endpoint: Option<String>,
    /// Whether this peer is currently live. A membership-level
    /// deprovision releases the address back to the pool (re-provisioning
    /// allocates a fresh one); a device-level disable leaves the lease
    /// intact so re-enabling the device does not reshuffle addresses
    /// (`DESIGN.md` open-question note).
    pub enabled: bool,
    /// Why `enabled` is currently `false`; `None` while `enabled` is
    /// `true`. Lets [`crate::service::PeerProvisioningEngine::enable_device_peers`]
    /// tell a device-lifecycle disable (safe to restore) apart from a
    /// membership deprovision (lease already released, must not be
    /// restored).
    pub disabled_reason: Option<DisabledReason>,
    /// When this peer row was first created.
    pub created_at: DateTime<Utc>,
}

/// A device eligible for provisioning, as resolved and handed in by the
/// caller (`gc-server`, typically bridging from `gc-devices`). This crate
/// never looks devices up itself (`DESIGN.md` crate-decoupling note).
#[derive(Debug, Clone)]
pub struct DeviceKey {
    /// The device's id.
    pub device_id: DeviceId,
    /// The device's current `WireGuard` public key.
    pub public_key: String,
}
