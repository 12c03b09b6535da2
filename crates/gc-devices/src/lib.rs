//! Device registration, heartbeat, and offline detection (`spec.md` §4.5).
//!
//! ```
//! use gc_devices::{DeviceService, HeartbeatReport, RegisterDeviceRequest, TenantId, UserId};
//! use gc_devices::ports::{NoopDeviceConfigSource, NoopDeviceNotifier};
//! use gc_devices::repository::InMemoryDeviceRepository;
//!
//! let svc = DeviceService::new(InMemoryDeviceRepository::new(), NoopDeviceNotifier, NoopDeviceConfigSource);
//! let user = UserId::from_uuid(uuid::Uuid::new_v4());
//! let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
//!
//! let device = svc
//!     .register_device(
//!         user,
//!         tenant,
//!         RegisterDeviceRequest {
//!             name: "laptop".into(),
//!             platform: "linux".into(),
//!             pub_key: "A".repeat(43) + "=",
//!             host_name: None,
//!             os_version: None,
//!         },
//!     )
//!     .unwrap();
//!
//! let beat = svc.heartbeat(device.id, user, tenant, HeartbeatReport::default()).unwrap();
//! assert!(beat.active);
//! ```

pub mod error;
pub mod ports;
pub mod repository;
pub mod service;
pub mod types;

pub use error::{Error, Result};
pub use service::DeviceService;
pub use types::{
    Device, DeviceId, DevicePatch, HeartbeatReport, InterfaceSpec, NetworkInterfaceView, Platform, PeerView,
    RegisterDeviceRequest, TenantId, UserId,
};
