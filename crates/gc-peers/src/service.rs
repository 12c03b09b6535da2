//! The Peer Provisioning Engine (`spec.md` §4.7): derives the full peer
//! set for a (network, user) pair from active devices and keeps it in
//! sync with membership and device lifecycle events.
//!
//! This crate never looks up devices, memberships, or network geometry
//! itself (`DESIGN.md` crate-decoupling note): every entry point takes
//! the facts it needs as arguments, handed in by `gc-server` after it has
//! already resolved them against `gc-devices`/`gc-membership`/`gc-network`.
//! The one direct dependency is `gc_network::Ipam`, reused rather than
//! reimplemented for address allocation.

use chrono::Utc;
use gc_network::Ipam;
use ipnet::Ipv4Net;
use tracing::warn;

use crate::error::Result;
use crate::repository::PeerRepository;
use crate::types::{DeviceKey, DisabledReason, NetworkId, Peer, PeerId, UserId};

/// The Peer Provisioning Engine, generic over its storage backend.
///
/// Holds its own [`Ipam`] rather than sharing `gc-network`'s instance:
/// each network's address pool is independent state keyed by
/// [`NetworkId`], so two `Ipam` instances never disagree as long as every
/// allocation for a given network flows through the same one — which in a
/// real deployment means `gc-server` constructs exactly one engine and
/// shares it across every caller.
pub struct PeerProvisioningEngine<R: PeerRepository> {
    repo: R,
    ipam: Ipam,
}

impl<R: PeerRepository> PeerProvisioningEngine<R> {
    /// Build an engine over a repository, with a fresh address pool.
    pub fn new(repo: R) -> Self {
        Self { repo, ipam: Ipam::new() }
    }

    /// **Provisioning for user U in network N** (`spec.md` §4.7, steps
    /// 1-2). For every device in `devices` without an enabled peer row in
    /// `network_id`, allocates an address and inserts one. Idempotent: a
    /// device that already has an enabled peer is left untouched. Returns
    /// every enabled peer the user now has in this network (new and
    /// pre-existing), so the caller can hand the full set to the
    /// reconciler or notifier without a second lookup.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::NoAddressesAvailable`] if the
    /// network's pool is exhausted partway through; peers already
    /// inserted before the exhaustion are kept (self-healing on the next
    /// reconciliation, per `spec.md` §5 cancellation policy).
    pub fn provision_user_in_network(
        &self,
        network_id: NetworkId,
        user_id: UserId,
        cidr: &Ipv4Net,
        keepalive_secs: Option<u16>,
        devices: &[DeviceKey],
    ) -> Result<Vec<Peer>> {
        for device in devices {
            if self.repo.get_enabled(network_id, device.device_id).is_some() {
                continue;
            }
            let lease = self.ipam.allocate(network_id, cidr, device.device_id.as_uuid())?;
            let peer = Peer {
                id: PeerId::new(),
                network_id,
                device_id: device.device_id,
                user_id,
                public_key: device.public_key.clone(),
                allowed_ip: lease.ip,
                persistent_keepalive: keepalive_secs,
                endpoint: None,
                enabled: true,
                disabled_reason: None,
                created_at: Utc::now(),
            };
            self.repo.put(peer);
        }
        Ok(self.repo.list_enabled_for_user(network_id, user_id))
    }

    /// **Deprovisioning** (`spec.md` §4.7, symmetric to provisioning):
    /// disables every enabled peer `user_id` holds in `network_id` and
    /// releases its address back to the pool. Idempotent: a user with no
    /// enabled peers is a no-op.
    ///
    /// Marked [`DisabledReason::Membership`] rather than just `enabled =
    /// false`: the address has already gone back into the pool and may be
    /// handed to a different user by the time the device comes back
    /// online, so [`Self::enable_device_peers`] must never resurrect this
    /// row.
    pub fn deprovision_user_in_network(&self, network_id: NetworkId, user_id: UserId) {
        for mut peer in self.repo.list_enabled_for_user(network_id, user_id) {
            self.ipam.release(network_id, peer.allowed_ip);
            peer.enabled = false;
            peer.disabled_reason = Some(DisabledReason::Membership);
            self.repo.put(peer);
        }
    }

    /// **Device registered while member of ≥1 network** (`spec.md` §4.7):
    /// provisions one peer row per network the device's owner is already
    /// an approved member of. `networks` is the resolved set of (network,
    /// cidr, keepalive) tuples for those memberships, handed in by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::NoAddressesAvailable`] if any one
    /// network's pool is exhausted; other networks in the batch still
    /// succeed (each iteration is independent).
    pub fn provision_device_in_networks(
        &self,
        user_id: UserId,
        device: &DeviceKey,
        networks: &[(NetworkId, Ipv4Net, Option<u16>)],
    ) -> Result<Vec<Peer>> {
        let mut created = Vec::new();
        let mut first_err = None;
        for (network_id, cidr, keepalive) in networks {
            match self.provision_user_in_network(*network_id, user_id, cidr, *keepalive, std::slice::from_ref(device))
            {
                Ok(peers) => created.extend(peers.into_iter().filter(|p| p.device_id == device.device_id)),
                Err(e) => {
                    warn!(network_id = %network_id, error = %e, "peer provisioning failed for device");
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            if created.is_empty() {
                return Err(e);
            }
        }
        Ok(created)
    }

    /// **Device disabled/deleted → disable peer rows it owns**
    /// (`spec.md` §4.7). Unlike membership deprovisioning, the address
    /// lease is *not* released: the device may be re-enabled, and the
    /// spec only requires that disabled peers are excluded from the
    /// reconciler's view, not that their address is reclaimed
    /// immediately (`DESIGN.md` open-question note).
    pub fn disable_device_peers(&self, device_id: crate::types::DeviceId) {
        for mut peer in self.repo.list_for_device(device_id) {
            if peer.enabled {
                peer.enabled = false;
                peer.disabled_reason = Some(DisabledReason::Device);
                self.repo.put(peer);
            }
        }
    }

    /// Re-enables every peer row a device owns that was disabled by
    /// [`Self::disable_device_peers`], without reallocating addresses.
    ///
    /// Rows disabled by [`Self::deprovision_user_in_network`] are left
    /// alone: their address lease was already released and may since have
    /// been reassigned to another device, so blindly flipping `enabled`
    /// back on would hand that device's traffic someone else's address.
    /// A membership-disabled row only comes back once the user rejoins
    /// the network and provisioning allocates it a fresh lease.
    pub fn enable_device_peers(&self, device_id: crate::types::DeviceId) {
        for mut peer in self.repo.list_for_device(device_id) {
            if !peer.enabled && peer.disabled_reason == Some(DisabledReason::Device) {
                peer.enabled = true;
                peer.disabled_reason = None;
                self.repo.put(peer);
            }
        }
    }

    /// Every enabled peer row, across every network and tenant
    /// (`spec.md` §4.8: the input to the `WireGuard` reconciler, which
    /// applies no tenant filter since the data plane is a single host).
    #[must_use]
    pub fn list_all_enabled(&self) -> Vec<Peer> {
        self.repo.list_all_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryPeerRepository;
    use crate::types::DeviceId;
    use std::net::Ipv4Addr;
    use uuid::Uuid;

    fn cidr() -> Ipv4Net {
        "10.1.0.0/24".parse().unwrap()
    }

    fn device(pub_key: &str) -> DeviceKey {
        DeviceKey { device_id: DeviceId::from_uuid(Uuid::new_v4()), public_key: pub_key.to_string() }
    }

    #[test]
    fn provisioning_assigns_lowest_free_addresses() {
        let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
        let network_id = NetworkId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let devices = vec![device("PK1"), device("PK2")];

        let peers = engine.provision_user_in_network(network_id, user_id, &cidr(), Some(25), &devices).unwrap();
        let mut ips: Vec<_> = peers.iter().map(|p| p.allowed_ip).collect();
        ips.sort();
        assert_eq!(ips, vec![Ipv4Addr::new(10, 1, 0, 2), Ipv4Addr::new(10, 1, 0, 3)]);
    }

    #[test]
    fn provisioning_is_idempotent() {
        let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
        let network_id = NetworkId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let devices = vec![device("PK1")];

        let first = engine.provision_user_in_network(network_id, user_id, &cidr(), None, &devices).unwrap();
        let second = engine.provision_user_in_network(network_id, user_id, &cidr(), None, &devices).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].allowed_ip, second[0].allowed_ip);
    }

    #[test]
    fn deprovisioning_releases_address_for_reuse() {
        let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
        let network_id = NetworkId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let devices = vec![device("PK1")];

        let first = engine.provision_user_in_network(network_id, user_id, &cidr(), None, &devices).unwrap();
        let address = first[0].allowed_ip;

        engine.deprovision_user_in_network(network_id, user_id);
        assert!(engine.repo.get_enabled(network_id, devices[0].device_id).is_none());

        let other_user = UserId::from_uuid(Uuid::new_v4());
        let other_devices = vec![device("PK2")];
        let reprovisioned =
            engine.provision_user_in_network(network_id, other_user, &cidr(), None, &other_devices).unwrap();
        assert_eq!(reprovisioned[0].allowed_ip, address);
    }

    #[test]
    fn deprovisioning_is_idempotent() {
        let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
        let network_id = NetworkId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        engine.deprovision_user_in_network(network_id, user_id);
        engine.deprovision_user_in_network(network_id, user_id);
    }

    #[test]
    fn disabling_a_device_keeps_its_address() {
        let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
        let network_id = NetworkId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let devices = vec![device("PK1")];
        let first = engine.provision_user_in_network(network_id, user_id, &cidr(), None, &devices).unwrap();
        let address = first[0].allowed_ip;

        engine.disable_device_peers(devices[0].device_id);
        assert!(engine.repo.get_enabled(network_id, devices[0].device_id).is_none());

        engine.enable_device_peers(devices[0].device_id);
        let restored = engine.repo.get_enabled(network_id, devices[0].device_id).unwrap();
        assert_eq!(restored.allowed_ip, address);
    }

    #[test]
    fn enabling_a_device_does_not_resurrect_a_deprovisioned_membership() {
        let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
        let network_id = NetworkId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let devices = vec![device("PK1")];
        engine.provision_user_in_network(network_id, user_id, &cidr(), None, &devices).unwrap();

        engine.deprovision_user_in_network(network_id, user_id);
        assert!(engine.repo.get_enabled(network_id, devices[0].device_id).is_none());

        // The device coming back online must not restore a peer whose
        // lease was already released back to the pool.
        engine.enable_device_peers(devices[0].device_id);
        assert!(engine.repo.get_enabled(network_id, devices[0].device_id).is_none());
    }

    #[test]
    fn list_all_enabled_spans_networks() {
        let engine = PeerProvisioningEngine::new(InMemoryPeerRepository::new());
        let n1 = NetworkId::from_uuid(Uuid::new_v4());
        let n2 = NetworkId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        engine.provision_user_in_network(n1, user_id, &cidr(), None, &[device("PK1")]).unwrap();
        engine.provision_user_in_network(n2, user_id, &cidr(), None, &[device("PK2")]).unwrap();
        assert_eq!(engine.list_all_enabled().len(), 2);
    }
}
