//! Membership persistence port.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{JoinRequest, JoinRequestState, NetworkId, NetworkInvite, NetworkMembership, Status, UserId};

/// The facts about a network that the membership engine needs but does not
/// own (`gc-network` owns the authoritative row). `gc-server` implements
/// this by delegating to `gc-network`; `gc-membership` has no compile-time
/// dependency on that crate (`DESIGN.md` crate-decoupling note).
pub trait NetworkLookup: Send + Sync {
    /// The network's tenant, and its join policy. `None` if the network
    /// does not exist or is soft-deleted — the caller rewrites this to
    /// [`Error::NotFound`], never leaking existence across tenants.
    fn lookup(&self, network_id: NetworkId) -> Option<NetworkInfo>;
}

/// Minimal network facts needed by [`crate::service::MembershipService`].
#[derive(Debug, Clone, Copy)]
pub struct NetworkInfo {
    /// The owning tenant, for isolation checks.
    pub tenant_id: crate::types::TenantId,
    /// How new members join (`spec.md` §4.4).
    pub join_policy: JoinPolicy,
}

/// Mirrors `gc_network::JoinPolicy`, duplicated per the crate-decoupling
/// note rather than imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Joining is immediately approved.
    Open,
    /// Joining creates a pending request an admin must approve.
    Approval,
    /// Joining requires a valid invite token.
    Invite,
}

/// Capability set a concrete store must provide for
/// [`crate::service::MembershipService`]. An in-memory implementation
/// ([`InMemoryMembershipRepository`]) satisfies the same contract as a
/// persistent one (`spec.md` §9, "Polymorphism").
pub trait MembershipRepository: Send + Sync {
    /// Fetch a membership row, if any (approved or banned).
    fn get_membership(&self, network_id: NetworkId, user_id: UserId) -> Option<NetworkMembership>;
    /// Insert or replace a membership row.
    fn put_membership(&self, membership: NetworkMembership);
    /// Delete a membership row entirely (kick/leave; ban is a status
    /// transition, not a delete).
    fn remove_membership(&self, network_id: NetworkId, user_id: UserId);
    /// All membership rows for a network.
    fn list_memberships(&self, network_id: NetworkId) -> Vec<NetworkMembership>;
    /// Every approved membership row for a user, across all networks.
    fn list_memberships_for_user(&self, user_id: UserId) -> Vec<NetworkMembership>;

    /// Fetch the single pending join request for (network, user), if any.
    fn get_pending_request(&self, network_id: NetworkId, user_id: UserId) -> Option<JoinRequest>;
    /// Fetch a join request by id regardless of state.
    fn get_request(&self, id: Uuid) -> Option<JoinRequest>;
    /// Insert or replace a join request row.
    fn put_request(&self, request: JoinRequest);
    /// All pending join requests for a network.
    fn list_pending_requests(&self, network_id: NetworkId) -> Vec<JoinRequest>;

    /// Insert a new network invite; token must be unique.
    fn create_invite(&self, invite: NetworkInvite) -> Result<NetworkInvite>;
    /// Fetch an invite by its opaque token.
    fn get_invite(&self, token: &str) -> Option<NetworkInvite>;
    /// Replace a previously created invite (used to decrement `uses_left`).
    fn update_invite(&self, invite: NetworkInvite) -> Result<NetworkInvite>;
}

#[derive(Default)]
struct Store {
    memberships: HashMap<(NetworkId, UserId), NetworkMembership>,
    requests: HashMap<Uuid, JoinRequest>,
    invites: HashMap<String, NetworkInvite>,
}

/// In-memory [`MembershipRepository`], backing property tests and local
/// development. Cheaply cloneable: clones share the same underlying
/// store, so `gc-server` can hand a second handle to a collaborator that
/// needs read access without going through the full service.
#[derive(Default, Clone)]
pub struct InMemoryMembershipRepository {
    store: std::sync::Arc<RwLock<Store>>,
}

impl InMemoryMembershipRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipRepository for InMemoryMembershipRepository {
    fn get_membership(&self, network_id: NetworkId, user_id: UserId) -> Option<NetworkMembership> {
        self.store.read().memberships.get(&(network_id, user_id)).cloned()
    }

    fn put_membership(&self, membership: NetworkMembership) {
        self.store.write().memberships.insert((membership.network_id, membership.user_id), membership);
    }

    fn remove_membership(&self, network_id: NetworkId, user_id: UserId) {
        self.store.write().memberships.remove(&(network_id, user_id));
    }

    fn list_memberships(&self, network_id: NetworkId) -> Vec<NetworkMembership> {
        self.store.read().memberships.values().filter(|m| m.network_id == network_id).cloned().collect()
    }

    fn list_memberships_for_user(&self, user_id: UserId) -> Vec<NetworkMembership> {
        self.store
            .read()
            .memberships
            .values()
            .filter(|m| m.user_id == user_id && m.status == Status::Approved)
            .cloned()
            .collect()
    }

    fn get_pending_request(&self, network_id: NetworkId, user_id: UserId) -> Option<JoinRequest> {
        self.store
            .read()
            .requests
            .values()
            .find(|r| r.network_id == network_id && r.user_id == user_id && r.state == JoinRequestState::Pending)
            .cloned()
    }

    fn get_request(&self, id: Uuid) -> Option<JoinRequest> {
        self.store.read().requests.get(&id).cloned()
    }

    fn put_request(&self, request: JoinRequest) {
        self.store.write().requests.insert(request.id, request);
    }

    fn list_pending_requests(&self, network_id: NetworkId) -> Vec<JoinRequest> {
        self.store
            .read()
            .requests
            .values()
            .filter(|r| r.network_id == network_id && r.state == JoinRequestState::Pending)
            .cloned()
            .collect()
    }

    fn create_invite(&self, invite: NetworkInvite) -> Result<NetworkInvite> {
        let mut store = self.store.write();
        if store.invites.contains_key(&invite.token) {
            return Err(Error::Internal { reason: "invite token collision".into() });
        }
        store.invites.insert(invite.token.clone(), invite.clone());
        Ok(invite)
    }

    fn get_invite(&self, token: &str) -> Option<NetworkInvite> {
        self.store.read().invites.get(token).cloned()
    }

    fn update_invite(&self, invite: NetworkInvite) -> Result<NetworkInvite> {
        let mut store = self.store.write();
        if !store.invites.contains_key(&invite.token) {
            return Err(Error::NotFound);
        }
        store.invites.insert(invite.token.clone(), invite.clone());
        Ok(invite)
    }
}

/// Marks the current time for request/membership timestamps; a thin
/// wrapper so call sites read as intent rather than a bare `Utc::now()`.
#[must_use]
pub fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}
