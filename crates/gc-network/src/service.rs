//! The Network Service (`spec.md` §4.3): network CRUD, CIDR allocation
//! guardrails, and tenant isolation.

use chrono::Utc;
use gc_idempotency::{Fingerprint, IdempotencyError, InMemoryIdempotencyStore, Outcome};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::repository::NetworkRepository;
use crate::types::{CreateNetworkRequest, JoinPolicy, ListView, Network, NetworkId, NetworkPatch, TenantId, UserId, Visibility};

const MAX_NAME_LEN: usize = 64;

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidRequest { reason: format!("name must be 1-{MAX_NAME_LEN} characters") });
    }
    Ok(())
}

fn parse_cidr(cidr: &str) -> Result<Ipv4Net> {
    cidr.parse::<Ipv4Net>().map_err(|e| Error::CidrInvalid { reason: e.to_string() })
}

/// Fingerprinted view of [`CreateNetworkRequest`] used for idempotency
/// replay detection; a different `tenant_id`/`user` pair with the same key
/// is a caller bug, not covered here, since the key is scoped per-caller.
#[derive(Serialize, Deserialize)]
struct CreateFingerprintPayload<'a> {
    tenant_id: TenantId,
    name: &'a str,
    cidr: &'a str,
    visibility: Visibility,
    join_policy: JoinPolicy,
    dns: &'a Option<String>,
    mtu: Option<u32>,
    split_tunnel: bool,
}

/// The Network Service, generic over its storage backend.
pub struct NetworkService<R: NetworkRepository> {
    repo: R,
    idempotency: InMemoryIdempotencyStore,
}

impl<R: NetworkRepository> NetworkService<R> {
    /// Build a service over a repository and a fresh idempotency store.
    pub fn new(repo: R) -> Self {
        Self { repo, idempotency: InMemoryIdempotencyStore::new() }
    }

    fn visible(&self, id: NetworkId, tenant_id: TenantId) -> Option<Network> {
        self.repo.get(id).filter(|n| n.tenant_id == tenant_id && n.is_live())
    }

    /// **CreateNetwork(req, user, tenant, idempotency_key)**. Idempotent on
    /// `(idempotency_key, fingerprint)` (`spec.md` §4.3, S3).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for a malformed name or empty key,
    /// [`Error::CidrInvalid`] for an unparseable CIDR,
    /// [`Error::CidrOverlap`] if the CIDR overlaps another network in the
    /// same tenant, and [`Error::IdempotencyConflict`] on key reuse with a
    /// different request.
    pub fn create_network(
        &self,
        req: &CreateNetworkRequest,
        created_by: UserId,
        tenant_id: TenantId,
        idempotency_key: &str,
    ) -> Result<Network> {
        if idempotency_key.is_empty() {
            return Err(Error::InvalidRequest { reason: "idempotency key required".into() });
        }
        validate_name(&req.name)?;
        let cidr = parse_cidr(&req.cidr)?;

        let fingerprint = Fingerprint::of(&CreateFingerprintPayload {
            tenant_id,
            name: &req.name,
            cidr: &req.cidr,
            visibility: req.visibility,
            join_policy: req.join_policy,
            dns: &req.dns,
            mtu: req.mtu,
            split_tunnel: req.split_tunnel,
        });

        match self.idempotency.begin(idempotency_key, fingerprint) {
            Ok(Outcome::Replayed(value)) => {
                return serde_json::from_value(value)
                    .map_err(|e| Error::Internal { reason: format!("corrupt idempotency replay: {e}") });
            }
            Ok(Outcome::InFlight) => return Err(Error::IdempotencyConflict),
            Ok(Outcome::Fresh) => {}
            Err(IdempotencyError::Conflict { .. }) => return Err(Error::IdempotencyConflict),
        }

        let result = self.create_network_inner(req, &cidr, created_by, tenant_id);
        match &result {
            Ok(network) => self.idempotency.complete(idempotency_key, fingerprint, network),
            Err(_) => self.idempotency.abandon(idempotency_key),
        }
        result
    }

    fn create_network_inner(
        &self,
        req: &CreateNetworkRequest,
        cidr: &Ipv4Net,
        created_by: UserId,
        tenant_id: TenantId,
    ) -> Result<Network> {
        let existing = self.repo.list_by_tenant(tenant_id);
        if existing.iter().any(|n| n.is_live() && n.name.eq_ignore_ascii_case(&req.name)) {
            return Err(Error::InvalidRequest { reason: "name already used in this tenant".into() });
        }
        if existing.iter().any(|n| n.is_live() && cidrs_overlap(&n.cidr, cidr)) {
            return Err(Error::CidrOverlap);
        }

        let now = Utc::now();
        let network = Network {
            id: NetworkId::new(),
            tenant_id,
            name: req.name.clone(),
            cidr: *cidr,
            visibility: req.visibility,
            join_policy: req.join_policy,
            dns: req.dns.clone(),
            mtu: req.mtu,
            split_tunnel: req.split_tunnel,
            created_by,
            soft_deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(network)
    }

    /// **GetNetwork**. Tenant mismatch or soft-deletion is always reported
    /// as [`Error::NotFound`], never a distinct "forbidden" (`spec.md` §4.3,
    /// §7: never leak existence).
    pub fn get_network(&self, id: NetworkId, tenant_id: TenantId) -> Result<Network> {
        self.visible(id, tenant_id).ok_or(Error::NotFound)
    }

    /// Fetch a live network by id with no tenant-isolation check.
    ///
    /// This exists solely for the composition root's cross-service
    /// adapters (`gc-membership::NetworkLookup`, peer provisioning's
    /// CIDR/keepalive lookup) which are handed only a `network_id` and
    /// must resolve its owning tenant themselves — unlike [`Self::get_network`],
    /// this is never reachable from an external request handler.
    #[must_use]
    pub fn lookup_unchecked(&self, id: NetworkId) -> Option<Network> {
        self.repo.get(id).filter(Network::is_live)
    }

    /// **ListNetworks**. `public` is every live public network in the
    /// tenant; `mine` is those created by `caller`; `all` requires
    /// `is_admin`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for `ListView::All` without admin.
    pub fn list_networks(&self, tenant_id: TenantId, view: ListView, caller: UserId, is_admin: bool) -> Result<Vec<Network>> {
        let all = self.repo.list_by_tenant(tenant_id);
        let live: Vec<Network> = all.into_iter().filter(Network::is_live).collect();
        match view {
            ListView::Public => Ok(live.into_iter().filter(|n| n.visibility == Visibility::Public).collect()),
            ListView::Mine => Ok(live.into_iter().filter(|n| n.created_by == caller).collect()),
            ListView::All => {
                if !is_admin {
                    return Err(Error::Forbidden);
                }
                Ok(live)
            }
        }
    }

    /// **UpdateNetwork (patch)**. The CIDR is immutable; name/enum fields
    /// are validated before the patch is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] on tenant mismatch/soft-delete, and
    /// [`Error::InvalidRequest`] for an invalid name.
    pub fn update_network(&self, id: NetworkId, tenant_id: TenantId, patch: NetworkPatch) -> Result<Network> {
        let mut network = self.visible(id, tenant_id).ok_or(Error::NotFound)?;
        if let Some(name) = &patch.name {
            validate_name(name)?;
            network.name = name.clone();
        }
        if let Some(visibility) = patch.visibility {
            network.visibility = visibility;
        }
        if let Some(join_policy) = patch.join_policy {
            network.join_policy = join_policy;
        }
        if let Some(dns) = patch.dns {
            network.dns = dns;
        }
        if let Some(mtu) = patch.mtu {
            network.mtu = mtu;
        }
        if let Some(split_tunnel) = patch.split_tunnel {
            network.split_tunnel = split_tunnel;
        }
        network.updated_at = Utc::now();
        self.repo.update(network)
    }

    /// **DeleteNetwork (soft)**. Soft-deleted networks become invisible to
    /// every subsequent read (`spec.md` §3).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] on tenant mismatch/already-deleted.
    pub fn delete_network(&self, id: NetworkId, tenant_id: TenantId) -> Result<()> {
        let mut network = self.visible(id, tenant_id).ok_or(Error::NotFound)?;
        network.soft_deleted_at = Some(Utc::now());
        network.updated_at = Utc::now();
        self.repo.update(network)?;
        Ok(())
    }
}

fn cidrs_overlap(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network()) || a.contains(&b.broadcast()) || b.contains(&a.broadcast())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryNetworkRepository;

    fn service() -> NetworkService<InMemoryNetworkRepository> {
        NetworkService::new(InMemoryNetworkRepository::new())
    }

    fn req(name: &str, cidr: &str) -> CreateNetworkRequest {
        CreateNetworkRequest {
            name: name.into(),
            cidr: cidr.into(),
            visibility: Visibility::Private,
            join_policy: JoinPolicy::Open,
            dns: None,
            mtu: None,
            split_tunnel: false,
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let network = svc.create_network(&req("prod", "10.1.0.0/24"), user, tenant, "k1").unwrap();
        let fetched = svc.get_network(network.id, tenant).unwrap();
        assert_eq!(fetched.id, network.id);
    }

    #[test]
    fn tenant_mismatch_is_not_found_not_forbidden() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let other = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let network = svc.create_network(&req("prod", "10.1.0.0/24"), user, tenant, "k1").unwrap();
        assert!(matches!(svc.get_network(network.id, other), Err(Error::NotFound)));
    }

    #[test]
    fn overlapping_cidr_in_same_tenant_is_rejected() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        svc.create_network(&req("prod", "10.0.0.0/24"), user, tenant, "k1").unwrap();
        let err = svc.create_network(&req("staging", "10.0.0.0/24"), user, tenant, "k2").unwrap_err();
        assert!(matches!(err, Error::CidrOverlap));
    }

    #[test]
    fn overlapping_cidr_across_tenants_is_allowed() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let other = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        svc.create_network(&req("prod", "10.0.0.0/24"), user, tenant, "k1").unwrap();
        assert!(svc.create_network(&req("prod", "10.0.0.0/24"), user, other, "k2").is_ok());
    }

    #[test]
    fn malformed_cidr_is_rejected() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let err = svc.create_network(&req("prod", "not-a-cidr"), user, tenant, "k1").unwrap_err();
        assert!(matches!(err, Error::CidrInvalid { .. }));
    }

    #[test]
    fn idempotent_replay_returns_same_network() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let request = req("prod", "10.0.0.0/24");
        let first = svc.create_network(&request, user, tenant, "k1").unwrap();
        let second = svc.create_network(&request, user, tenant, "k1").unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn idempotency_key_reused_with_different_request_conflicts() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        svc.create_network(&req("prod", "10.0.0.0/24"), user, tenant, "k1").unwrap();
        let err = svc.create_network(&req("other", "10.1.0.0/24"), user, tenant, "k1").unwrap_err();
        assert!(matches!(err, Error::IdempotencyConflict));
    }

    #[test]
    fn missing_idempotency_key_is_invalid_request() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let err = svc.create_network(&req("prod", "10.0.0.0/24"), user, tenant, "").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn list_views_filter_correctly() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let owner = UserId::from_uuid(uuid::Uuid::new_v4());
        let other = UserId::from_uuid(uuid::Uuid::new_v4());
        let mut public_req = req("pub", "10.0.0.0/24");
        public_req.visibility = Visibility::Public;
        svc.create_network(&public_req, owner, tenant, "k1").unwrap();
        svc.create_network(&req("priv", "10.1.0.0/24"), other, tenant, "k2").unwrap();

        assert_eq!(svc.list_networks(tenant, ListView::Public, owner, false).unwrap().len(), 1);
        assert_eq!(svc.list_networks(tenant, ListView::Mine, owner, false).unwrap().len(), 1);
        assert!(svc.list_networks(tenant, ListView::All, owner, false).is_err());
        assert_eq!(svc.list_networks(tenant, ListView::All, owner, true).unwrap().len(), 2);
    }

    #[test]
    fn soft_deleted_network_is_invisible() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let network = svc.create_network(&req("prod", "10.0.0.0/24"), user, tenant, "k1").unwrap();
        svc.delete_network(network.id, tenant).unwrap();
        assert!(matches!(svc.get_network(network.id, tenant), Err(Error::NotFound)));
    }

    #[test]
    fn update_patch_only_touches_set_fields() {
        let svc = service();
        let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let network = svc.create_network(&req("prod", "10.0.0.0/24"), user, tenant, "k1").unwrap();
        let patch = NetworkPatch { mtu: Some(Some(1420)), ..Default::default() };
        let updated = svc.update_network(network.id, tenant, patch).unwrap();
        assert_eq!(updated.mtu, Some(1420));
        assert_eq!(updated.name, "prod");
    }
}
