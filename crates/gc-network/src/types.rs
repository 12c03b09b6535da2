//! Core types for the Network Service (`spec.md` §3).

use std::fmt;

use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tenant, local to this crate (see `DESIGN.md`
/// crate-decoupling note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
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

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

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

/// Unique identifier for a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(Uuid);

impl NetworkId {
    /// Create a new random `NetworkId`.
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

impl Default for NetworkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who may discover a network via a `public` [`crate::service::ListView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Listed in the tenant's public network directory.
    Public,
    /// Visible only to members / the creator / tenant admins.
    Private,
}

/// How a user may join a network (`gc-membership` consumes this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Joining is immediately approved.
    Open,
    /// Joining creates a pending request an admin must approve.
    Approval,
    /// Joining requires a valid invite token.
    Invite,
}

/// A logical overlay network owned by a tenant (`spec.md` §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    /// Unique network identifier.
    pub id: NetworkId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Name, unique within the tenant.
    pub name: String,
    /// The overlay's address block.
    pub cidr: Ipv4Net,
    /// Discovery visibility.
    pub visibility: Visibility,
    /// How new members join.
    pub join_policy: JoinPolicy,
    /// Optional DNS server advertised to peers.
    pub dns: Option<String>,
    /// Optional interface MTU advertised to peers.
    pub mtu: Option<u32>,
    /// Whether peers should route only overlay traffic (vs. all traffic)
    /// through the tunnel.
    pub split_tunnel: bool,
    /// Who created the network (`ListNetworks` `mine` view).
    pub created_by: UserId,
    /// Soft-delete marker; soft-deleted networks are invisible to every
    /// read.
    pub soft_deleted_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Network {
    /// Whether this network is visible to reads (not soft-deleted).
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.soft_deleted_at.is_none()
    }
}

/// A request to create a network (`CreateNetwork`, `spec.md` §4.3).
#[derive(Debug, Clone)]
pub struct CreateNetworkRequest {
    /// Network name, unique within the tenant.
    pub name: String,
    /// CIDR string, e.g. `10.1.0.0/24`.
    pub cidr: String,
    /// Discovery visibility.
    pub visibility: Visibility,
    /// Join policy.
    pub join_policy: JoinPolicy,
    /// Optional DNS server.
    pub dns: Option<String>,
    /// Optional MTU.
    pub mtu: Option<u32>,
    /// Split-tunnel flag.
    pub split_tunnel: bool,
}

/// A partial update to a network (`UpdateNetwork`, `spec.md` §4.3). `None`
/// fields are left unchanged. The CIDR itself is immutable after creation
/// (changing the address space would orphan existing peer leases).
#[derive(Debug, Clone, Default)]
pub struct NetworkPatch {
    /// New name.
    pub name: Option<String>,
    /// New visibility.
    pub visibility: Option<Visibility>,
    /// New join policy.
    pub join_policy: Option<JoinPolicy>,
    /// New DNS server (`Some(None)` clears it).
    pub dns: Option<Option<String>>,
    /// New MTU (`Some(None)` clears it).
    pub mtu: Option<Option<u32>>,
    /// New split-tunnel flag.
    pub split_tunnel: Option<bool>,
}

/// The three views supported by `ListNetworks` (`spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView {
    /// All networks with `visibility = public` in the tenant.
    Public,
    /// Networks created by the caller.
    Mine,
    /// Every network in the tenant, admin-only.
    All,
}

/// An IPAM lease: one address reserved to one device within one network
/// (`spec.md` §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Lease {
    /// Owning network.
    pub network_id: NetworkId,
    /// Leased address.
    pub ip: std::net::Ipv4Addr,
    /// Device the address is leased to.
    pub device_id: Uuid,
}
