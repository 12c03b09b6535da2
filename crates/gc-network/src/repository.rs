//! Network persistence port.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::{Network, NetworkId, TenantId};

/// Capability set a concrete store must provide for
/// [`crate::service::NetworkService`]. An in-memory implementation
/// ([`InMemoryNetworkRepository`]) satisfies the same contract as a
/// persistent one (`spec.md` §9, "Polymorphism").
pub trait NetworkRepository: Send + Sync {
    /// Insert a brand-new network.
    fn create(&self, network: Network) -> Result<Network>;
    /// Fetch by id, regardless of soft-delete or tenant (callers enforce
    /// isolation/visibility themselves).
    fn get(&self, id: NetworkId) -> Option<Network>;
    /// Replace a previously created network in full.
    fn update(&self, network: Network) -> Result<Network>;
    /// All networks belonging to a tenant, including soft-deleted ones
    /// (callers filter).
    fn list_by_tenant(&self, tenant_id: TenantId) -> Vec<Network>;
}

/// In-memory [`NetworkRepository`], backing property tests and local
/// development.
#[derive(Default)]
pub struct InMemoryNetworkRepository {
    networks: RwLock<HashMap<NetworkId, Network>>,
}

impl InMemoryNetworkRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetworkRepository for InMemoryNetworkRepository {
    fn create(&self, network: Network) -> Result<Network> {
        let mut networks = self.networks.write();
        networks.insert(network.id, network.clone());
        Ok(network)
    }

    fn get(&self, id: NetworkId) -> Option<Network> {
        self.networks.read().get(&id).cloned()
    }

    fn update(&self, network: Network) -> Result<Network> {
        let mut networks = self.networks.write();
        if !networks.contains_key(&network.id) {
            return Err(Error::NotFound);
        }
        networks.insert(network.id, network.clone());
        Ok(network)
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> Vec<Network> {
        self.networks.read().values().filter(|n| n.tenant_id == tenant_id).cloned().collect()
    }
}
