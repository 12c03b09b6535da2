//! Core types for the Device Service (`spec.md` §3, §4.5).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user, local to this crate (see `DESIGN.md`
/// crate-decoupling note).
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

/// Unique identifier for a tenant, local to this crate.
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

/// Unique identifier for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Create a new random `DeviceId`.
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

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client platform a device runs on (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Windows daemon.
    Windows,
    /// Linux daemon.
    Linux,
    /// `macOS` daemon.
    Macos,
    /// Android app.
    Android,
    /// iOS app.
    Ios,
}

impl Platform {
    /// Parse a platform from its wire string, as `RegisterDevice` receives
    /// it (`spec.md` §4.5: "validates `platform ∈ {...}`").
    ///
    /// # Errors
    ///
    /// Returns `Err(())` for any string outside the enumerated set; the
    /// caller maps this to [`crate::error::Error::InvalidRequest`].
    pub fn parse(s: &str) -> Result<Self, ()> {
        match s {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Macos),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            _ => Err(()),
        }
    }
}

/// A registered client device (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Unique device identifier.
    pub id: DeviceId,
    /// Owning user.
    pub user_id: UserId,
    /// Owning tenant (must match the user's tenant at registration).
    pub tenant_id: TenantId,
    /// Human-readable name (e.g. "Alice's laptop").
    pub name: String,
    /// Client platform.
    pub platform: Platform,
    /// 44-character base64-encoded `WireGuard` public key, unique among
    /// the owning user's devices.
    pub pub_key: String,
    /// Derived view of recent heartbeat activity.
    pub active: bool,
    /// When the device was explicitly disabled, if it was.
    pub disabled_at: Option<DateTime<Utc>>,
    /// Last heartbeat time.
    pub last_seen: DateTime<Utc>,
    /// Last-reported tunnel-facing IP address.
    pub ip_address: Option<String>,
    /// Last-reported hostname.
    pub host_name: Option<String>,
    /// Last-reported OS version string.
    pub os_version: Option<String>,
    /// Last-reported daemon version.
    pub daemon_ver: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// Whether this device can currently heartbeat or receive peers
    /// (`spec.md` §3: "a disabled device cannot heartbeat and has no
    /// peers").
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.disabled_at.is_none()
    }
}

/// Request payload for `RegisterDevice` (`spec.md` §4.5).
#[derive(Debug, Clone)]
pub struct RegisterDeviceRequest {
    /// Human-readable name.
    pub name: String,
    /// Platform string, validated against the enumerated set.
    pub platform: String,
    /// 44-character base64 public key.
    pub pub_key: String,
    /// Optional hostname reported at registration time.
    pub host_name: Option<String>,
    /// Optional OS version reported at registration time.
    pub os_version: Option<String>,
}

/// A partial update to a device (`UpdateDevice`, `spec.md` §4.5). `None`
/// fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct DevicePatch {
    /// New display name.
    pub name: Option<String>,
}

/// Parameters reported by a `Heartbeat` call.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatReport {
    /// Tunnel-facing IP address, if reported.
    pub ip_address: Option<String>,
    /// Daemon version, if reported.
    pub daemon_ver: Option<String>,
}

/// One network's view of the `WireGuard` interface a device should run,
/// composed by `GetDeviceConfig` from the device's active peer rows
/// (`spec.md` §4.5; supplemented per `SPEC_FULL.md` §3, grounded on
/// `claw-wireguard::config::InterfaceConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterfaceView {
    /// The network this fragment belongs to.
    pub network_id: Uuid,
    /// This device's overlay address in the network, `/32` CIDR.
    pub address: String,
    /// Network-advertised DNS server, if any.
    pub dns: Option<String>,
    /// Network-advertised MTU, if any.
    pub mtu: Option<u32>,
    /// Every other active peer in the network, as the data plane would
    /// need to see them.
    pub peers: Vec<PeerView>,
}

/// A single peer entry as seen from a device's own interface config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerView {
    /// The peer's public key.
    pub public_key: String,
    /// The peer's allowed IPs.
    pub allowed_ips: Vec<String>,
    /// Keepalive interval in seconds, if set.
    pub persistent_keepalive: Option<u16>,
    /// Last-known endpoint, if any.
    pub endpoint: Option<String>,
}

/// Full `GetDeviceConfig` response: the device's interface across every
/// network it has active peers in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceSpec {
    /// The device's own public key.
    pub public_key: String,
    /// One entry per network the device has an active peer in.
    pub networks: Vec<NetworkInterfaceView>,
}
