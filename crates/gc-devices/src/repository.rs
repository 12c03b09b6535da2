//! Storage abstraction for devices.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{Device, DeviceId, TenantId, UserId};

/// Capability trait for device storage. Implementations are free to back
/// this with any store; [`InMemoryDeviceRepository`] is the reference
/// implementation used by tests and, by default, `gc-server`.
pub trait DeviceRepository: Send + Sync {
    /// Insert a brand-new device. The caller has already checked
    /// public-key uniqueness.
    fn insert(&self, device: Device);

    /// Fetch a device by id, tenant-unfiltered.
    fn get(&self, id: DeviceId) -> Option<Device>;

    /// Replace a device's stored row wholesale.
    fn put(&self, device: Device);

    /// Remove a device entirely (`DeleteDevice`).
    fn remove(&self, id: DeviceId) -> Option<Device>;

    /// List every device owned by a user within a tenant.
    fn list_by_user(&self, tenant_id: TenantId, user_id: UserId) -> Vec<Device>;

    /// List every device in a tenant, regardless of owner (used by the
    /// offline-detection sweep).
    fn list_by_tenant(&self, tenant_id: TenantId) -> Vec<Device>;

    /// Whether a public key is already registered to this user.
    fn pub_key_taken(&self, user_id: UserId, pub_key: &str) -> bool;
}

/// In-memory [`DeviceRepository`], `RwLock<HashMap<..>>`-backed.
#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<HashMap<DeviceId, Device>>,
}

impl InMemoryDeviceRepository {
    /// Construct an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceRepository for InMemoryDeviceRepository {
    fn insert(&self, device: Device) {
        self.devices.write().insert(device.id, device);
    }

    fn get(&self, id: DeviceId) -> Option<Device> {
        self.devices.read().get(&id).cloned()
    }

    fn put(&self, device: Device) {
        self.devices.write().insert(device.id, device);
    }

    fn remove(&self, id: DeviceId) -> Option<Device> {
        self.devices.write().remove(&id)
    }

    fn list_by_user(&self, tenant_id: TenantId, user_id: UserId) -> Vec<Device> {
        self.devices
            .read()
            .values()
            .filter(|d| d.tenant_id == tenant_id && d.user_id == user_id)
            .cloned()
            .collect()
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> Vec<Device> {
        self.devices.read().values().filter(|d| d.tenant_id == tenant_id).cloned().collect()
    }

    fn pub_key_taken(&self, user_id: UserId, pub_key: &str) -> bool {
        self.devices.read().values().any(|d| d.user_id == user_id && d.pub_key == pub_key)
    }
}
