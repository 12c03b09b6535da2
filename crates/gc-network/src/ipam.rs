//! Per-network IP address management (`spec.md` §4.6).
//!
//! Allocation is deterministic lowest-free-IP, adapted from the teacher's
//! region-pool allocator (`allocation.rs::RegionPool`) but without its
//! `next_candidate` wraparound state: the spec requires a specific
//! deterministic address (not merely "some free address") for each lease,
//! which a stateful cursor cannot guarantee across releases.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Lease, NetworkId};

#[derive(Default)]
struct Pool {
    allocated: HashMap<Ipv4Addr, Uuid>,
}

/// IPAM: one address pool per network, guarded by a per-network critical
/// section (`spec.md` §9, "Concurrency primitives").
#[derive(Default)]
pub struct Ipam {
    pools: RwLock<HashMap<NetworkId, Pool>>,
}

impl Ipam {
    /// Create an empty IPAM.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Usable host range for a network CIDR: network and broadcast
    /// addresses excluded, and the first usable address reserved for the
    /// network itself (`spec.md` §4.6).
    fn usable_range(cidr: &Ipv4Net) -> (u32, u32) {
        let network = u32::from(cidr.network());
        let broadcast = u32::from(cidr.broadcast());
        (network + 2, broadcast.saturating_sub(1))
    }

    /// **Allocate(network_id, device_id) → ip**. Deterministic lowest
    /// free address in the network's usable range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAddressesAvailable`] if the pool is exhausted.
    pub fn allocate(&self, network_id: NetworkId, cidr: &Ipv4Net, device_id: Uuid) -> Result<Lease> {
        let mut pools = self.pools.write();
        let pool = pools.entry(network_id).or_default();
        let (first, last) = Self::usable_range(cidr);
        let mut candidate = first;
        while candidate <= last {
            let ip = Ipv4Addr::from(candidate);
            if !pool.allocated.contains_key(&ip) {
                pool.allocated.insert(ip, device_id);
                return Ok(Lease { network_id, ip, device_id });
            }
            candidate += 1;
        }
        Err(Error::NoAddressesAvailable)
    }

    /// **Reserve(network_id, ip, device_id)**. Claims a specific address,
    /// for migrations or operator-assigned statics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressNotInPool`] if `ip` falls outside the
    /// network's usable range, or [`Error::AddressAlreadyAllocated`] if it
    /// is already leased.
    pub fn reserve(&self, network_id: NetworkId, cidr: &Ipv4Net, ip: Ipv4Addr, device_id: Uuid) -> Result<Lease> {
        let (first, last) = Self::usable_range(cidr);
        let value = u32::from(ip);
        if value < first || value > last {
            return Err(Error::AddressNotInPool);
        }
        let mut pools = self.pools.write();
        let pool = pools.entry(network_id).or_default();
        if pool.allocated.contains_key(&ip) {
            return Err(Error::AddressAlreadyAllocated);
        }
        pool.allocated.insert(ip, device_id);
        Ok(Lease { network_id, ip, device_id })
    }

    /// **Release(network_id, ip)**. No-op if the address was not leased,
    /// matching the idempotent-deprovisioning contract of `spec.md` §4.7.
    pub fn release(&self, network_id: NetworkId, ip: Ipv4Addr) {
        if let Some(pool) = self.pools.write().get_mut(&network_id) {
            pool.allocated.remove(&ip);
        }
    }

    /// Release every lease held by a device across a network (used when a
    /// device is deprovisioned entirely).
    pub fn release_device(&self, network_id: NetworkId, device_id: Uuid) {
        if let Some(pool) = self.pools.write().get_mut(&network_id) {
            pool.allocated.retain(|_, owner| *owner != device_id);
        }
    }

    /// Number of addresses currently leased in a network.
    #[must_use]
    pub fn allocated_count(&self, network_id: NetworkId) -> usize {
        self.pools.read().get(&network_id).map_or(0, |p| p.allocated.len())
    }

    /// Drop a network's pool entirely (network deletion).
    pub fn drop_network(&self, network_id: NetworkId) {
        self.pools.write().remove(&network_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn allocation_starts_after_network_and_gateway_addresses() {
        let ipam = Ipam::new();
        let net = NetworkId::new();
        let cidr = cidr("10.1.0.0/24");
        let d1 = Uuid::new_v4();
        let d2 = Uuid::new_v4();
        let lease1 = ipam.allocate(net, &cidr, d1).unwrap();
        let lease2 = ipam.allocate(net, &cidr, d2).unwrap();
        assert_eq!(lease1.ip, Ipv4Addr::new(10, 1, 0, 2));
        assert_eq!(lease2.ip, Ipv4Addr::new(10, 1, 0, 3));
    }

    #[test]
    fn released_address_is_reused_as_lowest_free() {
        let ipam = Ipam::new();
        let net = NetworkId::new();
        let cidr = cidr("10.1.0.0/30");
        let d1 = Uuid::new_v4();
        let lease = ipam.allocate(net, &cidr, d1).unwrap();
        assert_eq!(lease.ip, Ipv4Addr::new(10, 1, 0, 2));
        assert!(matches!(ipam.allocate(net, &cidr, Uuid::new_v4()), Err(Error::NoAddressesAvailable)));
        ipam.release(net, lease.ip);
        let lease2 = ipam.allocate(net, &cidr, Uuid::new_v4()).unwrap();
        assert_eq!(lease2.ip, Ipv4Addr::new(10, 1, 0, 2));
    }

    #[test]
    fn no_ip_reuse_within_a_network() {
        let ipam = Ipam::new();
        let net = NetworkId::new();
        let cidr = cidr("10.1.0.0/29");
        let mut seen = std::collections::HashSet::new();
        while let Ok(lease) = ipam.allocate(net, &cidr, Uuid::new_v4()) {
            assert!(seen.insert(lease.ip));
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn reserve_rejects_address_outside_pool() {
        let ipam = Ipam::new();
        let net = NetworkId::new();
        let cidr = cidr("10.1.0.0/24");
        let err = ipam.reserve(net, &cidr, Ipv4Addr::new(10, 2, 0, 5), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::AddressNotInPool));
    }

    #[test]
    fn release_device_frees_all_its_leases() {
        let ipam = Ipam::new();
        let net = NetworkId::new();
        let cidr = cidr("10.1.0.0/24");
        let device = Uuid::new_v4();
        ipam.allocate(net, &cidr, device).unwrap();
        ipam.release_device(net, device);
        assert_eq!(ipam.allocated_count(net), 0);
    }
}
