//! Narrow collaborator ports. `gc-server` supplies the real
//! implementations that bridge to `gc-peers`/`gc-events`; tests and
//! standalone use of this crate get silent no-ops.

use crate::types::{Device, InterfaceSpec};

/// Notifies other services that a device's liveness changed.
///
/// Failures are intentionally not propagated: a notification failure must
/// never fail the heartbeat or sweep that triggered it (mirrors
/// `gc-membership::ports::MembershipNotifier`).
pub trait DeviceNotifier: Send + Sync {
    /// A previously-inactive device just heartbeat successfully
    /// (`spec.md` §4.5: `DeviceOnline`).
    fn device_online(&self, device: &Device);

    /// The offline-detection sweep flipped a device to inactive
    /// (`spec.md` §4.5: `DeviceOffline`).
    fn device_offline(&self, device: &Device);

    /// A brand-new device just registered for a user who may already be
    /// an approved member of one or more networks (`spec.md` §4.7:
    /// "Device registered while member of ≥1 network → provision peer
    /// rows in each such network").
    fn device_registered(&self, device: &Device);
}

/// No-op [`DeviceNotifier`], the default for standalone use of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDeviceNotifier;

impl DeviceNotifier for NoopDeviceNotifier {
    fn device_online(&self, _device: &Device) {}
    fn device_offline(&self, _device: &Device) {}
    fn device_registered(&self, _device: &Device) {}
}

/// Resolves the live peer set a device should see, across every network
/// it has an active peer in (`GetDeviceConfig`, `spec.md` §4.5).
///
/// This crate does not depend on `gc-peers`/`gc-network` directly (see
/// `DESIGN.md` crate-decoupling note); `gc-server` implements this port by
/// delegating to the Peer Provisioning Engine and Network Service.
pub trait DeviceConfigSource: Send + Sync {
    /// Build the full interface spec for a device, or `None` if the
    /// device has no active peers anywhere.
    fn interface_spec(&self, device: &Device) -> Option<InterfaceSpec>;
}

/// [`DeviceConfigSource`] that always reports no peers, the default for
/// standalone use of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDeviceConfigSource;

impl DeviceConfigSource for NoopDeviceConfigSource {
    fn interface_spec(&self, _device: &Device) -> Option<InterfaceSpec> {
        None
    }
}
