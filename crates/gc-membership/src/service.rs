//! The Membership Engine (`spec.md` §4.4): join/approve/deny/kick/ban.

use chrono::Utc;
use gc_idempotency::{Fingerprint, IdempotencyError, InMemoryIdempotencyStore, Outcome};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ports::{MembershipNotifier, PeerProvisioner};
use crate::repository::{JoinPolicy, MembershipRepository, NetworkLookup};
use crate::types::{
    JoinOutcome, JoinRequest, JoinRequestState, NetworkId, NetworkInvite, NetworkMembership, Role, Status,
    TenantId, UserId,
};

const INVITE_TOKEN_BYTES: usize = 24;

#[derive(Serialize)]
struct JoinFingerprintPayload {
    network_id: NetworkId,
    user_id: UserId,
    invite_token: Option<String>,
}

/// The Membership Engine, generic over its storage backend and the
/// collaborator ports it drives on state transitions.
pub struct MembershipService<R: MembershipRepository, N: NetworkLookup, P: PeerProvisioner, M: MembershipNotifier> {
    repo: R,
    networks: N,
    provisioner: P,
    notifier: M,
    idempotency: InMemoryIdempotencyStore,
}

impl<R, N, P, M> MembershipService<R, N, P, M>
where
    R: MembershipRepository,
    N: NetworkLookup,
    P: PeerProvisioner,
    M: MembershipNotifier,
{
    /// Build a service over a repository, the network-lookup port, and the
    /// two collaborator ports.
    pub fn new(repo: R, networks: N, provisioner: P, notifier: M) -> Self {
        Self { repo, networks, provisioner, notifier, idempotency: InMemoryIdempotencyStore::new() }
    }

    fn network_or_not_found(&self, network_id: NetworkId, tenant_id: TenantId) -> Result<crate::repository::NetworkInfo> {
        let info = self.networks.lookup(network_id).ok_or(Error::NotFound)?;
        if info.tenant_id != tenant_id {
            return Err(Error::NotFound);
        }
        Ok(info)
    }

    fn role_of(&self, network_id: NetworkId, user_id: UserId) -> Option<Role> {
        self.repo.get_membership(network_id, user_id).filter(|m| m.status == Status::Approved).map(|m| m.role)
    }

    fn require_role(&self, network_id: NetworkId, actor: UserId, min: Role) -> Result<()> {
        match self.role_of(network_id, actor) {
            Some(role) if role >= min => Ok(()),
            _ => Err(Error::Forbidden),
        }
    }

    /// **JoinNetwork(network, user, tenant, idempotency_key, invite_token?)**
    /// (`spec.md` §4.4). Dispatches on the network's join policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a cross-tenant or missing network,
    /// [`Error::UserBanned`] if the caller is banned, [`Error::InvalidRequest`]
    /// for an empty idempotency key or a missing invite token under an
    /// invite policy, [`Error::AlreadyRequested`] for a duplicate pending
    /// request, and [`Error::IdempotencyConflict`] on key reuse with a
    /// different request.
    pub fn join_network(
        &self,
        network_id: NetworkId,
        user_id: UserId,
        tenant_id: TenantId,
        idempotency_key: &str,
        invite_token: Option<&str>,
    ) -> Result<JoinOutcome> {
        if idempotency_key.is_empty() {
            return Err(Error::InvalidRequest { reason: "idempotency key required".into() });
        }
        let info = self.network_or_not_found(network_id, tenant_id)?;

        let fingerprint = Fingerprint::of(&JoinFingerprintPayload {
            network_id,
            user_id,
            invite_token: invite_token.map(str::to_string),
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

        let result = self.join_network_inner(network_id, user_id, info.join_policy, invite_token);
        match &result {
            Ok(outcome) => self.idempotency.complete(idempotency_key, fingerprint, outcome),
            Err(_) => self.idempotency.abandon(idempotency_key),
        }
        result
    }

    fn join_network_inner(
        &self,
        network_id: NetworkId,
        user_id: UserId,
        join_policy: JoinPolicy,
        invite_token: Option<&str>,
    ) -> Result<JoinOutcome> {
        if let Some(existing) = self.repo.get_membership(network_id, user_id) {
            match existing.status {
                Status::Banned => return Err(Error::UserBanned),
                Status::Approved => return Ok(JoinOutcome::Membership(existing)),
            }
        }

        if let Some(token) = invite_token {
            return self.redeem_invite_token(network_id, user_id, token).map(JoinOutcome::Membership);
        }

        match join_policy {
            JoinPolicy::Open => {
                let membership = self.upsert_approved_member(network_id, user_id, Role::Member);
                self.provisioner.provision(network_id, user_id);
                self.notifier.member_joined(network_id, user_id);
                Ok(JoinOutcome::Membership(membership))
            }
            JoinPolicy::Approval => {
                if self.repo.get_pending_request(network_id, user_id).is_some() {
                    return Err(Error::AlreadyRequested);
                }
                let request = JoinRequest {
                    id: Uuid::new_v4(),
                    network_id,
                    user_id,
                    state: JoinRequestState::Pending,
                    requested_at: Utc::now(),
                    decided_at: None,
                };
                self.repo.put_request(request.clone());
                self.notifier.join_pending(network_id, user_id);
                Ok(JoinOutcome::Requested(request))
            }
            JoinPolicy::Invite => Err(Error::InvalidRequest { reason: "this network requires an invite token".into() }),
        }
    }

    fn upsert_approved_member(&self, network_id: NetworkId, user_id: UserId, role: Role) -> NetworkMembership {
        let membership = NetworkMembership {
            network_id,
            user_id,
            role,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        };
        self.repo.put_membership(membership.clone());
        membership
    }

    fn redeem_invite_token(&self, network_id: NetworkId, user_id: UserId, token: &str) -> Result<NetworkMembership> {
        let invite = self.repo.get_invite(token).ok_or(Error::InviteTokenExpired)?;
        if invite.network_id != network_id {
            return Err(Error::InviteTokenExpired);
        }
        let now = Utc::now();
        if !invite.is_valid(now) {
            return Err(Error::InviteTokenExpired);
        }
        if invite.uses_max > 0 {
            let mut updated = invite.clone();
            updated.uses_left = updated.uses_left.saturating_sub(1);
            self.repo.update_invite(updated).map_err(|_| Error::InviteTokenExpired)?;
        }
        let membership = self.upsert_approved_member(network_id, user_id, Role::Member);
        self.provisioner.provision(network_id, user_id);
        self.notifier.member_joined(network_id, user_id);
        Ok(membership)
    }

    /// **ApproveJoinRequest(request_id, actor, tenant)** (`spec.md` §4.4).
    /// Requires `actor` to hold at least [`Role::Admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the request does not exist, is not
    /// pending, or belongs to a network outside `tenant`, and
    /// [`Error::Forbidden`] if `actor` lacks admin rights.
    pub fn approve_join_request(&self, request_id: Uuid, actor: UserId, tenant_id: TenantId) -> Result<NetworkMembership> {
        let mut request = self.repo.get_request(request_id).ok_or(Error::NotFound)?;
        if request.state != JoinRequestState::Pending {
            return Err(Error::NotFound);
        }
        self.network_or_not_found(request.network_id, tenant_id)?;
        self.require_role(request.network_id, actor, Role::Admin)?;

        request.state = JoinRequestState::Approved;
        request.decided_at = Some(Utc::now());
        self.repo.put_request(request.clone());

        let membership = self.upsert_approved_member(request.network_id, request.user_id, Role::Member);
        self.provisioner.provision(request.network_id, request.user_id);
        self.notifier.join_approved(request.network_id, request.user_id);
        Ok(membership)
    }

    /// **DenyJoinRequest(request_id, actor, tenant)** (`spec.md` §4.4).
    /// Requires `actor` to hold at least [`Role::Admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the request does not exist, is not
    /// pending, or belongs to a network outside `tenant`, and
    /// [`Error::Forbidden`] if `actor` lacks admin rights.
    pub fn deny_join_request(&self, request_id: Uuid, actor: UserId, tenant_id: TenantId) -> Result<JoinRequest> {
        let mut request = self.repo.get_request(request_id).ok_or(Error::NotFound)?;
        if request.state != JoinRequestState::Pending {
            return Err(Error::NotFound);
        }
        self.network_or_not_found(request.network_id, tenant_id)?;
        self.require_role(request.network_id, actor, Role::Admin)?;

        request.state = JoinRequestState::Denied;
        request.decided_at = Some(Utc::now());
        self.repo.put_request(request.clone());
        self.notifier.join_denied(request.network_id, request.user_id);
        Ok(request)
    }

    /// **KickMember(network, user, actor, tenant)** (`spec.md` §4.4).
    /// Removes the membership row outright; requires [`Role::Admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a cross-tenant network or a
    /// non-member target, and [`Error::Forbidden`] if `actor` lacks admin
    /// rights.
    pub fn kick_member(&self, network_id: NetworkId, user_id: UserId, actor: UserId, tenant_id: TenantId) -> Result<()> {
        self.network_or_not_found(network_id, tenant_id)?;
        self.require_role(network_id, actor, Role::Admin)?;
        if self.repo.get_membership(network_id, user_id).is_none() {
            return Err(Error::NotFound);
        }
        self.repo.remove_membership(network_id, user_id);
        self.provisioner.deprovision(network_id, user_id);
        self.notifier.member_left(network_id, user_id);
        Ok(())
    }

    /// **BanMember(network, user, actor, tenant)** (`spec.md` §4.4).
    /// Transitions the membership to [`Status::Banned`] rather than
    /// deleting it, so a future join attempt is rejected rather than
    /// silently re-admitted. Requires [`Role::Admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a cross-tenant network, and
    /// [`Error::Forbidden`] if `actor` lacks admin rights.
    pub fn ban_member(&self, network_id: NetworkId, user_id: UserId, actor: UserId, tenant_id: TenantId) -> Result<NetworkMembership> {
        self.network_or_not_found(network_id, tenant_id)?;
        self.require_role(network_id, actor, Role::Admin)?;

        let existing = self.repo.get_membership(network_id, user_id);
        let was_member = existing.is_some();
        let membership = NetworkMembership {
            network_id,
            user_id,
            role: existing.as_ref().map_or(Role::Member, |m| m.role),
            status: Status::Banned,
            joined_at: existing.map_or_else(Utc::now, |m| m.joined_at),
            banned_at: Some(Utc::now()),
            banned_by: Some(actor),
        };
        self.repo.put_membership(membership.clone());
        if was_member {
            self.provisioner.deprovision(network_id, user_id);
            self.notifier.member_left(network_id, user_id);
        }
        Ok(membership)
    }

    /// **ListMembers(network, actor, tenant)** (`spec.md` §4.4). Any
    /// approved member may list; returns only approved members (not bans).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a cross-tenant network, and
    /// [`Error::Forbidden`] if `actor` is not an approved member.
    pub fn list_members(&self, network_id: NetworkId, actor: UserId, tenant_id: TenantId) -> Result<Vec<NetworkMembership>> {
        self.network_or_not_found(network_id, tenant_id)?;
        self.require_role(network_id, actor, Role::Member)?;
        Ok(self
            .repo
            .list_memberships(network_id)
            .into_iter()
            .filter(|m| m.status == Status::Approved)
            .collect())
    }

    /// **ListJoinRequests(network, actor, tenant)** (`spec.md` §4.4).
    /// Requires [`Role::Admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a cross-tenant network, and
    /// [`Error::Forbidden`] if `actor` lacks admin rights.
    pub fn list_join_requests(&self, network_id: NetworkId, actor: UserId, tenant_id: TenantId) -> Result<Vec<JoinRequest>> {
        self.network_or_not_found(network_id, tenant_id)?;
        self.require_role(network_id, actor, Role::Admin)?;
        Ok(self.repo.list_pending_requests(network_id))
    }

    /// Whether `user_id` currently holds an approved membership in
    /// `network_id`. Used by other services (e.g. the peer engine) as a
    /// cheap authorization check.
    #[must_use]
    pub fn is_member(&self, network_id: NetworkId, user_id: UserId) -> bool {
        self.role_of(network_id, user_id).is_some()
    }

    /// Every network `user_id` currently holds an approved membership in.
    /// Used to fan out peer provisioning to a newly registered device
    /// (`spec.md` §4.7).
    #[must_use]
    pub fn networks_for_user(&self, user_id: UserId) -> Vec<NetworkId> {
        self.repo.list_memberships_for_user(user_id).into_iter().map(|m| m.network_id).collect()
    }

    /// **CreateInvite(network, actor, tenant, expires_at, uses_max)**
    /// (`spec.md` §4.4). Requires [`Role::Admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a cross-tenant network, and
    /// [`Error::Forbidden`] if `actor` lacks admin rights.
    pub fn create_invite(
        &self,
        network_id: NetworkId,
        actor: UserId,
        tenant_id: TenantId,
        expires_at: chrono::DateTime<Utc>,
        uses_max: u32,
    ) -> Result<NetworkInvite> {
        self.network_or_not_found(network_id, tenant_id)?;
        self.require_role(network_id, actor, Role::Admin)?;

        let invite = NetworkInvite {
            token: generate_invite_token(),
            network_id,
            created_by: actor,
            expires_at,
            uses_max,
            uses_left: uses_max,
            revoked_at: None,
        };
        self.repo.create_invite(invite)
    }
}

fn generate_invite_token() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();
    let body: String = (0..INVITE_TOKEN_BYTES)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("inv_{body}")
}

/// Legacy invite-token prefix (`spec.md` §4.4, §9): a token of the form
/// `net_<uuid>` is not looked up in the invite table at all — it names the
/// target network directly, bypassing the invite system entirely (a CLI
/// compatibility carryover from before invite tokens existed). Genuine
/// invite tokens are minted with the `inv_` prefix and never collide with
/// this form.
const LEGACY_NETWORK_PREFIX: &str = "net_";

impl<R, N, P, M> MembershipService<R, N, P, M>
where
    R: MembershipRepository,
    N: NetworkLookup,
    P: PeerProvisioner,
    M: MembershipNotifier,
{
    /// **`JoinByInviteCode`(token, user, tenant, idempotency_key)**
    /// (`spec.md` §4.4). Resolves the target network from the token alone
    /// — unlike [`Self::join_network`], the caller does not already know
    /// which network it names. A `net_<uuid>` token is the legacy direct
    /// form (`spec.md` §9 open question); any other token is looked up in
    /// the invite table and consumes one use atomically before routing to
    /// [`Self::join_network`] against the resolved network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InviteTokenExpired`] for an unknown, expired,
    /// revoked, or exhausted token, and otherwise whatever
    /// [`Self::join_network`] returns for the resolved network.
    pub fn join_by_invite_code(
        &self,
        token: &str,
        user_id: UserId,
        tenant_id: TenantId,
        idempotency_key: &str,
    ) -> Result<JoinOutcome> {
        if let Some(suffix) = token.strip_prefix(LEGACY_NETWORK_PREFIX) {
            let network_id = Uuid::parse_str(suffix)
                .map(NetworkId::from_uuid)
                .map_err(|_| Error::InviteTokenExpired)?;
            return self.join_network(network_id, user_id, tenant_id, idempotency_key, None);
        }

        let invite = self.repo.get_invite(token).ok_or(Error::InviteTokenExpired)?;
        self.join_network(invite.network_id, user_id, tenant_id, idempotency_key, Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{NoopMembershipNotifier, NoopPeerProvisioner};
    use crate::repository::{InMemoryMembershipRepository, NetworkInfo};
    use std::collections::HashMap;
    use std::sync::RwLock as StdRwLock;

    struct FakeNetworks {
        inner: StdRwLock<HashMap<NetworkId, NetworkInfo>>,
    }

    impl FakeNetworks {
        fn new() -> Self {
            Self { inner: StdRwLock::new(HashMap::new()) }
        }

        fn insert(&self, id: NetworkId, tenant_id: TenantId, join_policy: JoinPolicy) {
            self.inner.write().unwrap().insert(id, NetworkInfo { tenant_id, join_policy });
        }
    }

    impl NetworkLookup for FakeNetworks {
        fn lookup(&self, network_id: NetworkId) -> Option<NetworkInfo> {
            self.inner.read().unwrap().get(&network_id).copied()
        }
    }

    type TestService = MembershipService<InMemoryMembershipRepository, FakeNetworks, NoopPeerProvisioner, NoopMembershipNotifier>;

    fn make_service(join_policy: JoinPolicy) -> (TestService, NetworkId, TenantId) {
        let network_id = NetworkId::from_uuid(Uuid::new_v4());
        let tenant_id = TenantId::from_uuid(Uuid::new_v4());
        let networks = FakeNetworks::new();
        networks.insert(network_id, tenant_id, join_policy);
        let service = MembershipService::new(
            InMemoryMembershipRepository::new(),
            networks,
            NoopPeerProvisioner,
            NoopMembershipNotifier,
        );
        (service, network_id, tenant_id)
    }

    #[test]
    fn open_policy_joins_immediately() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let outcome = service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        match outcome {
            JoinOutcome::Membership(m) => assert_eq!(m.status, Status::Approved),
            JoinOutcome::Requested(_) => panic!("expected immediate membership"),
        }
        assert!(service.is_member(network_id, user_id));
    }

    #[test]
    fn approval_policy_creates_pending_request() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Approval);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let outcome = service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        match outcome {
            JoinOutcome::Requested(r) => assert_eq!(r.state, JoinRequestState::Pending),
            JoinOutcome::Membership(_) => panic!("expected a pending request"),
        }
        assert!(!service.is_member(network_id, user_id));
    }

    #[test]
    fn duplicate_pending_request_is_rejected() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Approval);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        let err = service.join_network(network_id, user_id, tenant_id, "key-2", None).unwrap_err();
        assert!(matches!(err, Error::AlreadyRequested));
    }

    #[test]
    fn invite_policy_without_token_is_invalid() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Invite);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let err = service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn tenant_mismatch_is_not_found() {
        let (service, network_id, _tenant_id) = make_service(JoinPolicy::Open);
        let wrong_tenant = TenantId::from_uuid(Uuid::new_v4());
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let err = service.join_network(network_id, user_id, wrong_tenant, "key-1", None).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn idempotent_replay_returns_same_outcome() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let first = service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        let second = service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        match (first, second) {
            (JoinOutcome::Membership(a), JoinOutcome::Membership(b)) => assert_eq!(a.user_id, b.user_id),
            _ => panic!("expected two memberships"),
        }
    }

    #[test]
    fn missing_idempotency_key_is_invalid_request() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let err = service.join_network(network_id, user_id, tenant_id, "", None).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn banned_member_cannot_rejoin() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        let admin = UserId::from_uuid(Uuid::new_v4());
        service.repo.put_membership(NetworkMembership {
            network_id,
            user_id: admin,
            role: Role::Admin,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        });
        service.ban_member(network_id, user_id, admin, tenant_id).unwrap();
        let err = service.join_network(network_id, user_id, tenant_id, "key-2", None).unwrap_err();
        assert!(matches!(err, Error::UserBanned));
    }

    #[test]
    fn approve_requires_admin_role() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Approval);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let outcome = service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        let request_id = match outcome {
            JoinOutcome::Requested(r) => r.id,
            JoinOutcome::Membership(_) => panic!("expected a pending request"),
        };
        let non_admin = UserId::from_uuid(Uuid::new_v4());
        service.repo.put_membership(NetworkMembership {
            network_id,
            user_id: non_admin,
            role: Role::Member,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        });
        let err = service.approve_join_request(request_id, non_admin, tenant_id).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn approve_promotes_pending_request_to_membership() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Approval);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let outcome = service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        let request_id = match outcome {
            JoinOutcome::Requested(r) => r.id,
            JoinOutcome::Membership(_) => panic!("expected a pending request"),
        };
        let admin = UserId::from_uuid(Uuid::new_v4());
        service.repo.put_membership(NetworkMembership {
            network_id,
            user_id: admin,
            role: Role::Admin,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        });
        let membership = service.approve_join_request(request_id, admin, tenant_id).unwrap();
        assert_eq!(membership.status, Status::Approved);
        assert!(service.is_member(network_id, user_id));
    }

    #[test]
    fn kick_removes_membership_entirely() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        let admin = UserId::from_uuid(Uuid::new_v4());
        service.repo.put_membership(NetworkMembership {
            network_id,
            user_id: admin,
            role: Role::Admin,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        });
        service.kick_member(network_id, user_id, admin, tenant_id).unwrap();
        assert!(!service.is_member(network_id, user_id));
        assert!(service.repo.get_membership(network_id, user_id).is_none());
    }

    #[test]
    fn networks_for_user_lists_only_approved_memberships() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        service.join_network(network_id, user_id, tenant_id, "key-1", None).unwrap();
        assert_eq!(service.networks_for_user(user_id), vec![network_id]);

        let admin = UserId::from_uuid(Uuid::new_v4());
        service.repo.put_membership(NetworkMembership {
            network_id,
            user_id: admin,
            role: Role::Admin,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        });
        service.ban_member(network_id, user_id, admin, tenant_id).unwrap();
        assert!(service.networks_for_user(user_id).is_empty());
    }

    #[test]
    fn list_members_requires_membership() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let outsider = UserId::from_uuid(Uuid::new_v4());
        let err = service.list_members(network_id, outsider, tenant_id).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn invite_join_consumes_one_use() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Invite);
        let admin = UserId::from_uuid(Uuid::new_v4());
        service.repo.put_membership(NetworkMembership {
            network_id,
            user_id: admin,
            role: Role::Admin,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        });
        let invite = service.create_invite(network_id, admin, tenant_id, Utc::now() + chrono::Duration::hours(1), 1).unwrap();
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let outcome = service.join_network(network_id, user_id, tenant_id, "key-1", Some(&invite.token)).unwrap();
        assert!(matches!(outcome, JoinOutcome::Membership(_)));

        let second_user = UserId::from_uuid(Uuid::new_v4());
        let err = service.join_network(network_id, second_user, tenant_id, "key-2", Some(&invite.token)).unwrap_err();
        assert!(matches!(err, Error::InviteTokenExpired));
    }

    #[test]
    fn join_by_invite_code_resolves_network_from_token() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Invite);
        let admin = UserId::from_uuid(Uuid::new_v4());
        service.repo.put_membership(NetworkMembership {
            network_id,
            user_id: admin,
            role: Role::Admin,
            status: Status::Approved,
            joined_at: Utc::now(),
            banned_at: None,
            banned_by: None,
        });
        let invite = service.create_invite(network_id, admin, tenant_id, Utc::now() + chrono::Duration::hours(1), 0).unwrap();
        assert!(invite.token.starts_with("inv_"));

        let user_id = UserId::from_uuid(Uuid::new_v4());
        let outcome = service.join_by_invite_code(&invite.token, user_id, tenant_id, "key-1").unwrap();
        assert!(matches!(outcome, JoinOutcome::Membership(_)));
        assert!(service.is_member(network_id, user_id));
    }

    #[test]
    fn join_by_invite_code_legacy_net_prefix_joins_directly() {
        let (service, network_id, tenant_id) = make_service(JoinPolicy::Open);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let legacy_token = format!("net_{network_id}");
        let outcome = service.join_by_invite_code(&legacy_token, user_id, tenant_id, "key-1").unwrap();
        assert!(matches!(outcome, JoinOutcome::Membership(_)));
        assert!(service.is_member(network_id, user_id));
    }

    #[test]
    fn join_by_invite_code_unknown_token_is_expired() {
        let (service, _network_id, tenant_id) = make_service(JoinPolicy::Invite);
        let user_id = UserId::from_uuid(Uuid::new_v4());
        let err = service.join_by_invite_code("inv_doesnotexist", user_id, tenant_id, "key-1").unwrap_err();
        assert!(matches!(err, Error::InviteTokenExpired));
    }
}
