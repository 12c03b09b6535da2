//! Peer persistence port.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{DeviceId, NetworkId, Peer, PeerId, UserId};

/// Capability set a concrete store must provide for
/// [`crate::service::PeerProvisioningEngine`]. An in-memory implementation
/// ([`InMemoryPeerRepository`]) satisfies the same contract as a
/// persistent one (`spec.md` §9, "Polymorphism").
pub trait PeerRepository: Send + Sync {
    /// The enabled peer row for (network, device), if one exists
    /// (`spec.md` §3: "(network_id, device_id) unique among non-disabled
    /// peers").
    fn get_enabled(&self, network_id: NetworkId, device_id: DeviceId) -> Option<Peer>;
    /// Insert or replace a peer row.
    fn put(&self, peer: Peer);
    /// Every enabled peer row belonging to `user_id` within `network_id`.
    fn list_enabled_for_user(&self, network_id: NetworkId, user_id: UserId) -> Vec<Peer>;
    /// Every peer row (enabled or not) owned by a device, across every
    /// network.
    fn list_for_device(&self, device_id: DeviceId) -> Vec<Peer>;
    /// Every enabled peer row for a device in one specific network.
    fn get_enabled_for_device_in_network(&self, network_id: NetworkId, device_id: DeviceId) -> Option<Peer> {
        self.get_enabled(network_id, device_id)
    }
    /// Every enabled peer row anywhere, used by the reconciler's data-plane
    /// sync (`spec.md` §4.8: "no tenant filter; the data plane is a single
    /// host").
    fn list_all_enabled(&self) -> Vec<Peer>;
}

#[derive(Default)]
struct Store {
    peers: HashMap<PeerId, Peer>,
}

/// In-memory [`PeerRepository`], backing property tests and local
/// development.
#[derive(Default)]
pub struct InMemoryPeerRepository {
    store: RwLock<Store>,
}

impl InMemoryPeerRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeerRepository for InMemoryPeerRepository {
    fn get_enabled(&self, network_id: NetworkId, device_id: DeviceId) -> Option<Peer> {
        self.store
            .read()
            .peers
            .values()
            .find(|p| p.network_id == network_id && p.device_id == device_id && p.enabled)
            .cloned()
    }

    fn put(&self, peer: Peer) {
        self.store.write().peers.insert(peer.id, peer);
    }

    fn list_enabled_for_user(&self, network_id: NetworkId, user_id: UserId) -> Vec<Peer> {
        self.store
            .read()
            .peers
            .values()
            .filter(|p| p.network_id == network_id && p.user_id == user_id && p.enabled)
            .cloned()
            .collect()
    }

    fn list_for_device(&self, device_id: DeviceId) -> Vec<Peer> {
        self.store.read().peers.values().filter(|p| p.device_id == device_id).cloned().collect()
    }

    fn list_all_enabled(&self) -> Vec<Peer> {
        self.store.read().peers.values().filter(|p| p.enabled).cloned().collect()
    }
}
