//! The Device Service (`spec.md` §4.5): registration, heartbeat,
//! enable/disable, and offline detection.

use chrono::{DateTime, Duration, Utc};
use gc_wireguard::keys::PublicKey;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::ports::{DeviceConfigSource, DeviceNotifier};
use crate::repository::DeviceRepository;
use crate::types::{Device, DeviceId, DevicePatch, HeartbeatReport, InterfaceSpec, Platform, RegisterDeviceRequest, TenantId, UserId};

/// The Device Service, generic over its storage backend and the two
/// collaborator ports it drives on state changes.
pub struct DeviceService<R: DeviceRepository, N: DeviceNotifier, C: DeviceConfigSource> {
    repo: R,
    notifier: N,
    config_source: C,
}

impl<R: DeviceRepository, N: DeviceNotifier, C: DeviceConfigSource> DeviceService<R, N, C> {
    /// Build a service over a repository and its two collaborator ports.
    pub fn new(repo: R, notifier: N, config_source: C) -> Self {
        Self { repo, notifier, config_source }
    }

    fn validate_pub_key(pub_key: &str) -> Result<()> {
        PublicKey::from_base64(pub_key)
            .map(|_| ())
            .map_err(|_| Error::InvalidRequest { reason: "public key must be a valid base64-encoded WireGuard key".into() })
    }

    /// **`RegisterDevice(name, platform, pub_key, ...)`** (`spec.md` §4.5).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] for an empty name, unrecognised platform,
    /// or malformed public key; [`Error::Conflict`] if the public key is
    /// already registered to one of the user's own devices.
    pub fn register_device(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        req: RegisterDeviceRequest,
    ) -> Result<Device> {
        if req.name.trim().is_empty() {
            return Err(Error::InvalidRequest { reason: "name must not be empty".into() });
        }
        let platform = Platform::parse(&req.platform)
            .map_err(|()| Error::InvalidRequest { reason: format!("unknown platform: {}", req.platform) })?;
        Self::validate_pub_key(&req.pub_key)?;
        if self.repo.pub_key_taken(user_id, &req.pub_key) {
            return Err(Error::Conflict);
        }

        let now = Utc::now();
        let device = Device {
            id: DeviceId::new(),
            user_id,
            tenant_id,
            name: req.name,
            platform,
            pub_key: req.pub_key,
            active: false,
            disabled_at: None,
            last_seen: now,
            ip_address: None,
            host_name: req.host_name,
            os_version: req.os_version,
            daemon_ver: None,
            created_at: now,
        };
        self.repo.insert(device.clone());
        info!(device_id = %device.id, user_id = %user_id, "device registered");
        self.notifier.device_registered(&device);
        Ok(device)
    }

    fn owned(&self, device_id: DeviceId, user_id: UserId, tenant_id: TenantId) -> Result<Device> {
        let device = self.repo.get(device_id).ok_or(Error::NotFound)?;
        if device.tenant_id != tenant_id || device.user_id != user_id {
            return Err(Error::NotFound);
        }
        Ok(device)
    }

    /// **`GetDevice`** (`spec.md` §4.5). Tenant- and owner-scoped; a
    /// mismatch looks identical to a missing device.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the device does not exist or is not owned
    /// by `user_id` within `tenant_id`.
    pub fn get_device(&self, device_id: DeviceId, user_id: UserId, tenant_id: TenantId) -> Result<Device> {
        self.owned(device_id, user_id, tenant_id)
    }

    /// **`ListDevices`** (`spec.md` §4.5): every device owned by a user.
    pub fn list_devices(&self, user_id: UserId, tenant_id: TenantId) -> Vec<Device> {
        self.repo.list_by_user(tenant_id, user_id)
    }

    /// **`UpdateDevice`** (`spec.md` §4.5): patch-semantics rename.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] per [`Self::owned`]; [`Error::InvalidRequest`]
    /// for a blank name.
    pub fn update_device(
        &self,
        device_id: DeviceId,
        user_id: UserId,
        tenant_id: TenantId,
        patch: DevicePatch,
    ) -> Result<Device> {
        let mut device = self.owned(device_id, user_id, tenant_id)?;
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidRequest { reason: "name must not be empty".into() });
            }
            device.name = name;
        }
        self.repo.put(device.clone());
        Ok(device)
    }

    /// **`DeleteDevice`** (`spec.md` §4.5). The caller (`gc-server`) is
    /// responsible for deprovisioning any peers this device holds before
    /// or after this call, via the Peer Provisioning Engine.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] per [`Self::owned`].
    pub fn delete_device(&self, device_id: DeviceId, user_id: UserId, tenant_id: TenantId) -> Result<()> {
        self.owned(device_id, user_id, tenant_id)?;
        self.repo.remove(device_id);
        Ok(())
    }

    /// **`DisableDevice`** (`spec.md` §4.5): a disabled device cannot
    /// heartbeat and has no peers. Idempotent.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] per [`Self::owned`].
    pub fn disable_device(&self, device_id: DeviceId, user_id: UserId, tenant_id: TenantId) -> Result<Device> {
        let mut device = self.owned(device_id, user_id, tenant_id)?;
        if device.is_enabled() {
            device.disabled_at = Some(Utc::now());
            device.active = false;
            self.repo.put(device.clone());
            self.notifier.device_offline(&device);
        }
        Ok(device)
    }

    /// **`EnableDevice`** (`spec.md` §4.5). Idempotent; does not itself
    /// mark the device active — that happens on the next successful
    /// heartbeat.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] per [`Self::owned`].
    pub fn enable_device(&self, device_id: DeviceId, user_id: UserId, tenant_id: TenantId) -> Result<Device> {
        let mut device = self.owned(device_id, user_id, tenant_id)?;
        device.disabled_at = None;
        self.repo.put(device.clone());
        Ok(device)
    }

    /// **`Heartbeat(device_id, ip?, daemon_ver?)`** (`spec.md` §4.5).
    /// Updates `last_seen` and flips `active = true`; if the device was
    /// previously inactive this emits `DeviceOnline` via the notifier
    /// port.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] per [`Self::owned`]; [`Error::Forbidden`] if
    /// the device is disabled.
    pub fn heartbeat(
        &self,
        device_id: DeviceId,
        user_id: UserId,
        tenant_id: TenantId,
        report: HeartbeatReport,
    ) -> Result<Device> {
        let mut device = self.owned(device_id, user_id, tenant_id)?;
        if !device.is_enabled() {
            return Err(Error::Forbidden { reason: "device is disabled".into() });
        }
        let was_active = device.active;
        device.last_seen = Utc::now();
        device.active = true;
        if report.ip_address.is_some() {
            device.ip_address = report.ip_address;
        }
        if report.daemon_ver.is_some() {
            device.daemon_ver = report.daemon_ver;
        }
        self.repo.put(device.clone());
        if !was_active {
            self.notifier.device_online(&device);
        }
        Ok(device)
    }

    /// **`GetDeviceConfig`** (`spec.md` §4.5): the device's full
    /// `WireGuard` interface spec, aggregated across every network it has
    /// an active peer in via the [`DeviceConfigSource`] port.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] per [`Self::owned`]; [`Error::Forbidden`] if
    /// the device is disabled; [`Error::NoPeers`] if the device has no
    /// active peer in any network.
    pub fn get_device_config(&self, device_id: DeviceId, user_id: UserId, tenant_id: TenantId) -> Result<InterfaceSpec> {
        let device = self.owned(device_id, user_id, tenant_id)?;
        if !device.is_enabled() {
            return Err(Error::Forbidden { reason: "device is disabled".into() });
        }
        self.config_source.interface_spec(&device).ok_or(Error::NoPeers)
    }

    /// Offline-detection sweep (`spec.md` §4.5): flips every device in
    /// `tenant_id` whose `last_seen` is older than `threshold` from active
    /// to inactive, emitting `DeviceOffline` for each. Intended to be
    /// called on a fixed interval from `gc-server`'s background loop,
    /// grounded on the teacher's missed-heartbeat registry sweep.
    pub fn sweep_offline(&self, tenant_id: TenantId, threshold: Duration) -> Vec<DeviceId> {
        let cutoff: DateTime<Utc> = Utc::now() - threshold;
        let mut flipped = Vec::new();
        for mut device in self.repo.list_by_tenant(tenant_id) {
            if device.active && device.last_seen < cutoff {
                device.active = false;
                self.repo.put(device.clone());
                self.notifier.device_offline(&device);
                warn!(device_id = %device.id, "device marked offline: missed heartbeat window");
                flipped.push(device.id);
            }
        }
        flipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{NoopDeviceConfigSource, NoopDeviceNotifier};
    use crate::repository::InMemoryDeviceRepository;
    use gc_wireguard::keys::KeyPair;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingNotifier {
        registered: AtomicUsize,
    }

    impl DeviceNotifier for CountingNotifier {
        fn device_online(&self, _device: &Device) {}
        fn device_offline(&self, _device: &Device) {}
        fn device_registered(&self, _device: &Device) {
            self.registered.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_key() -> String {
        KeyPair::generate().public_key().to_base64()
    }

    fn service() -> DeviceService<InMemoryDeviceRepository, NoopDeviceNotifier, NoopDeviceConfigSource> {
        DeviceService::new(InMemoryDeviceRepository::new(), NoopDeviceNotifier, NoopDeviceConfigSource)
    }

    fn register<N: DeviceNotifier>(svc: &DeviceService<InMemoryDeviceRepository, N, NoopDeviceConfigSource>, user: UserId, tenant: TenantId) -> Device {
        svc.register_device(
            user,
            tenant,
            RegisterDeviceRequest {
                name: "laptop".into(),
                platform: "linux".into(),
                pub_key: sample_key(),
                host_name: None,
                os_version: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn register_and_get_round_trip() {
        let svc = service();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let device = register(&svc, user, tenant);
        let fetched = svc.get_device(device.id, user, tenant).unwrap();
        assert_eq!(fetched.id, device.id);
        assert!(!fetched.active);
    }

    #[test]
    fn register_notifies_on_success_only() {
        let svc = DeviceService::new(InMemoryDeviceRepository::new(), CountingNotifier::default(), NoopDeviceConfigSource);
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        register(&svc, user, tenant);
        assert_eq!(svc.notifier.registered.load(Ordering::SeqCst), 1);

        let err = svc
            .register_device(
                user,
                tenant,
                RegisterDeviceRequest { name: "bad".into(), platform: "plan9".into(), pub_key: sample_key(), host_name: None, os_version: None },
            )
            .unwrap_err();
        assert_eq!(err.code(), "InvalidRequest");
        assert_eq!(svc.notifier.registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_rejects_invalid_platform() {
        let svc = service();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let err = svc
            .register_device(
                user,
                tenant,
                RegisterDeviceRequest {
                    name: "thing".into(),
                    platform: "plan9".into(),
                    pub_key: sample_key(),
                    host_name: None,
                    os_version: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "InvalidRequest");
    }

    #[test]
    fn register_rejects_duplicate_pub_key_for_same_user() {
        let svc = service();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let key = sample_key();
        svc.register_device(
            user,
            tenant,
            RegisterDeviceRequest { name: "a".into(), platform: "linux".into(), pub_key: key.clone(), host_name: None, os_version: None },
        )
        .unwrap();
        let err = svc
            .register_device(
                user,
                tenant,
                RegisterDeviceRequest { name: "b".into(), platform: "linux".into(), pub_key: key, host_name: None, os_version: None },
            )
            .unwrap_err();
        assert_eq!(err.code(), "Conflict");
    }

    #[test]
    fn get_device_hides_cross_tenant_rows() {
        let svc = service();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let other_tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let device = register(&svc, user, tenant);
        let err = svc.get_device(device.id, user, other_tenant).unwrap_err();
        assert_eq!(err.code(), "NotFound");
    }

    #[test]
    fn heartbeat_activates_device_and_disabled_device_rejects_heartbeat() {
        let svc = service();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let device = register(&svc, user, tenant);

        let beat = svc.heartbeat(device.id, user, tenant, HeartbeatReport::default()).unwrap();
        assert!(beat.active);

        svc.disable_device(device.id, user, tenant).unwrap();
        let err = svc.heartbeat(device.id, user, tenant, HeartbeatReport::default()).unwrap_err();
        assert_eq!(err.code(), "Forbidden");
    }

    #[test]
    fn sweep_offline_flips_stale_devices_only() {
        let svc = service();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let fresh = register(&svc, user, tenant);
        svc.heartbeat(fresh.id, user, tenant, HeartbeatReport::default()).unwrap();

        let stale = register(&svc, user, tenant);
        svc.heartbeat(stale.id, user, tenant, HeartbeatReport::default()).unwrap();
        let mut stale_row = svc.get_device(stale.id, user, tenant).unwrap();
        stale_row.last_seen = Utc::now() - Duration::hours(2);
        // Directly mutate the stored row to simulate a stale heartbeat.
        let repo = InMemoryDeviceRepository::new();
        repo.put(stale_row.clone());
        let svc2 = DeviceService::new(repo, NoopDeviceNotifier, NoopDeviceConfigSource);
        let flipped = svc2.sweep_offline(tenant, Duration::minutes(90));
        assert_eq!(flipped, vec![stale_row.id]);
    }

    #[test]
    fn get_device_config_with_no_peers_errors() {
        let svc = service();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let device = register(&svc, user, tenant);
        let err = svc.get_device_config(device.id, user, tenant).unwrap_err();
        assert_eq!(err.code(), "NotFound");
    }
}
