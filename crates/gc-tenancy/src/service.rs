//! The Tenant Service (`spec.md` §4.2): tenant CRUD, membership/role
//! management, invites, and announcements.

use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::password;
use crate::repository::TenantRepository;
use crate::types::{
    AccessType, Announcement, Cursor, Invite, Role, Tenant, TenantId, TenantMembership, TenantPatch, UserId,
    Visibility,
};

const MAX_NAME_LEN: usize = 128;
const INVITE_TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const INVITE_TOKEN_LEN: usize = 24;
const DEFAULT_INVITE_TTL_SECS: i64 = 7 * 24 * 3600;

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidRequest { reason: format!("name must be 1-{MAX_NAME_LEN} characters") });
    }
    Ok(())
}

fn generate_invite_token() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_TOKEN_LEN).map(|_| INVITE_TOKEN_ALPHABET[rng.gen_range(0..INVITE_TOKEN_ALPHABET.len())] as char).collect()
}

/// Result of [`TenantService::join_tenant`] or [`TenantService::join_by_code`]:
/// idempotent on an already-approved membership.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The resulting (possibly pre-existing) membership.
    pub membership: TenantMembership,
    /// Whether this call actually created the membership, vs. finding the
    /// caller already a member.
    pub created: bool,
}

/// The Tenant Service, generic over its storage backend.
pub struct TenantService<R: TenantRepository> {
    repo: R,
}

impl<R: TenantRepository> TenantService<R> {
    /// Build a service over a repository.
    pub const fn new(repo: R) -> Self {
        Self { repo }
    }

    /// The caller's current role in `tenant_id`, or `None` if they hold no
    /// membership row at all. Exposed publicly so the composition root can
    /// bridge this service's role table into other crates' `RoleLookup`-
    /// style ports (`gc-chat`, the event bus's `host`-room authorizer)
    /// without those crates depending on `gc-tenancy` directly.
    #[must_use]
    pub fn role_of(&self, tenant_id: TenantId, user_id: UserId) -> Option<Role> {
        self.repo.get_membership(tenant_id, user_id).map(|m| m.role)
    }

    fn require_role(&self, tenant_id: TenantId, user_id: UserId, min: Role) -> Result<Role> {
        match self.role_of(tenant_id, user_id) {
            Some(role) if role >= min => Ok(role),
            _ => Err(Error::Forbidden),
        }
    }

    /// **CreateTenant**. The creator becomes the immortal owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `name` is empty/too long, or if
    /// `access_type` is [`AccessType::Password`] without a `password`.
    pub fn create_tenant(
        &self,
        name: &str,
        visibility: Visibility,
        access_type: AccessType,
        password: Option<&str>,
        max_members: u32,
        owner_user_id: UserId,
    ) -> Result<Tenant> {
        validate_name(name)?;
        let password_hash = match access_type {
            AccessType::Password => {
                let pw = password.ok_or_else(|| Error::InvalidRequest {
                    reason: "password required for password-gated tenants".into(),
                })?;
                Some(self::password::hash(pw)?)
            }
            AccessType::Open | AccessType::InviteOnly => None,
        };

        let now = Utc::now();
        let tenant = Tenant {
            id: TenantId::new(),
            name: name.to_string(),
            visibility,
            access_type,
            password_hash,
            max_members,
            owner_user_id,
            created_at: now,
            updated_at: now,
        };
        let tenant = self.repo.create_tenant(tenant)?;
        self.repo.put_membership(TenantMembership::new(owner_user_id, tenant.id, Role::Owner));
        Ok(tenant)
    }

    /// **GetTenant**.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no tenant with `id` exists.
    pub fn get_tenant(&self, id: TenantId) -> Result<Tenant> {
        self.repo.get_tenant(id).ok_or(Error::NotFound)
    }

    /// **ListPublicTenants(cursor, search, limit)**. `search` matches
    /// case-insensitively against the name; returns the page plus an
    /// opaque cursor for the next page, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `cursor` does not decode.
    pub fn list_public_tenants(
        &self,
        cursor: Option<&str>,
        search: Option<&str>,
        limit: usize,
    ) -> Result<(Vec<Tenant>, Option<String>)> {
        let after = cursor.map(Cursor::decode).transpose()?;
        let search = search.map(str::to_lowercase);

        let mut tenants = self.repo.list_public_tenants();
        tenants.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_uuid().cmp(&b.id.as_uuid())));

        let mut filtered: Vec<Tenant> = tenants
            .into_iter()
            .filter(|t| search.as_ref().is_none_or(|s| t.name.to_lowercase().contains(s.as_str())))
            .skip_while(|t| {
                after.as_ref().is_some_and(|c| {
                    (t.name.as_str(), t.id.as_uuid()) <= (c.last_name.as_str(), c.last_id.as_uuid())
                })
            })
            .collect();

        let has_more = filtered.len() > limit;
        filtered.truncate(limit);
        let next_cursor = if has_more {
            filtered.last().map(|t| Cursor { last_name: t.name.clone(), last_id: t.id }.encode())
        } else {
            None
        };
        Ok((filtered, next_cursor))
    }

    /// **UpdateTenant**. Requires admin role or above.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::Forbidden`], or
    /// [`Error::InvalidRequest`] on a malformed patch.
    pub fn update_tenant(&self, tenant_id: TenantId, actor: UserId, patch: TenantPatch) -> Result<Tenant> {
        self.require_role(tenant_id, actor, Role::Admin)?;
        let mut tenant = self.repo.get_tenant(tenant_id).ok_or(Error::NotFound)?;

        if let Some(name) = &patch.name {
            validate_name(name)?;
            tenant.name = name.clone();
        }
        if let Some(visibility) = patch.visibility {
            tenant.visibility = visibility;
        }
        let becomes_password = patch.access_type.unwrap_or(tenant.access_type) == AccessType::Password;
        if becomes_password {
            if let Some(new_password) = &patch.new_password {
                tenant.password_hash = Some(self::password::hash(new_password)?);
            } else if tenant.password_hash.is_none() {
                return Err(Error::InvalidRequest { reason: "password required for password-gated tenants".into() });
            }
        } else if patch.access_type.is_some() {
            tenant.password_hash = None;
        }
        if let Some(access_type) = patch.access_type {
            tenant.access_type = access_type;
        }
        if let Some(max_members) = patch.max_members {
            tenant.max_members = max_members;
        }
        tenant.updated_at = Utc::now();
        self.repo.update_tenant(tenant)
    }

    /// **DeleteTenant**. Owner-only; refuses while non-owner members
    /// remain unless `cascade` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::Forbidden`] if the actor is
    /// not the owner or members remain without `cascade`.
    pub fn delete_tenant(&self, tenant_id: TenantId, actor: UserId, cascade: bool) -> Result<()> {
        let tenant = self.repo.get_tenant(tenant_id).ok_or(Error::NotFound)?;
        if tenant.owner_user_id != actor {
            return Err(Error::Forbidden);
        }
        if !cascade {
            let remaining = self.repo.list_memberships(tenant_id).into_iter().filter(|m| m.user_id != actor).count();
            if remaining > 0 {
                return Err(Error::Forbidden);
            }
        }
        self.repo.delete_tenant(tenant_id)
    }

    fn insert_new_member(&self, tenant: &Tenant, user_id: UserId) -> Result<TenantMembership> {
        let non_owner_members = self
            .repo
            .list_memberships(tenant.id)
            .into_iter()
            .filter(|m| m.role != Role::Banned && m.role != Role::Owner)
            .count() as u32;
        if tenant.max_members > 0 && non_owner_members >= tenant.max_members {
            return Err(Error::Forbidden);
        }
        let membership = TenantMembership::new(user_id, tenant.id, Role::Member);
        self.repo.put_membership(membership.clone());
        Ok(membership)
    }

    /// **JoinTenant(password?)**.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::UserBanned`],
    /// [`Error::InvalidCredentials`] (wrong/absent password),
    /// [`Error::InvalidRequest`] (invite-only requires `JoinByCode`), or
    /// [`Error::Forbidden`] (at capacity).
    pub fn join_tenant(&self, tenant_id: TenantId, user_id: UserId, password: Option<&str>) -> Result<JoinOutcome> {
        let tenant = self.repo.get_tenant(tenant_id).ok_or(Error::NotFound)?;
        if let Some(existing) = self.repo.get_membership(tenant_id, user_id) {
            if existing.is_banned() {
                return Err(Error::UserBanned);
            }
            return Ok(JoinOutcome { membership: existing, created: false });
        }

        match tenant.access_type {
            AccessType::Open => {}
            AccessType::Password => {
                let hash = tenant.password_hash.as_deref().unwrap_or_default();
                match password {
                    Some(pw) if self::password::verify(pw, hash) => {}
                    Some(_) => return Err(Error::InvalidCredentials),
                    None => return Err(Error::InvalidRequest { reason: "password required".into() }),
                }
            }
            AccessType::InviteOnly => {
                return Err(Error::InvalidRequest { reason: "invite token required".into() });
            }
        }

        let membership = self.insert_new_member(&tenant, user_id)?;
        Ok(JoinOutcome { membership, created: true })
    }

    /// **JoinByCode(invite)**.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown, expired, revoked, or
    /// exhausted invite, [`Error::UserBanned`], or [`Error::Forbidden`] at
    /// capacity.
    pub fn join_by_code(&self, token: &str, user_id: UserId) -> Result<JoinOutcome> {
        let mut invite = self.repo.get_invite(token).ok_or(Error::NotFound)?;
        if !invite.is_valid(Utc::now()) {
            return Err(Error::NotFound);
        }
        let tenant = self.repo.get_tenant(invite.tenant_id).ok_or(Error::NotFound)?;

        if let Some(existing) = self.repo.get_membership(tenant.id, user_id) {
            if existing.is_banned() {
                return Err(Error::UserBanned);
            }
            return Ok(JoinOutcome { membership: existing, created: false });
        }

        let membership = self.insert_new_member(&tenant, user_id)?;
        if invite.uses_max > 0 {
            invite.uses_left = invite.uses_left.saturating_sub(1);
        }
        self.repo.update_invite(invite)?;
        Ok(JoinOutcome { membership, created: true })
    }

    /// **LeaveTenant**. The owner cannot leave (ownership transfer is a
    /// non-goal; `spec.md` §9 open question).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`] for the owner.
    pub fn leave_tenant(&self, tenant_id: TenantId, user_id: UserId) -> Result<()> {
        let tenant = self.repo.get_tenant(tenant_id).ok_or(Error::NotFound)?;
        if tenant.owner_user_id == user_id {
            return Err(Error::Forbidden);
        }
        self.repo.get_membership(tenant_id, user_id).ok_or(Error::NotFound)?;
        self.repo.remove_membership(tenant_id, user_id);
        Ok(())
    }

    /// **UpdateMemberRole**. Requires `actor.role > target.role` and
    /// `actor.role >= admin`; self-demotion and assigning `owner` are
    /// forbidden.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::Forbidden`], or
    /// [`Error::InvalidRequest`] for an unassignable role.
    pub fn update_member_role(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        target: UserId,
        new_role: Role,
    ) -> Result<TenantMembership> {
        if new_role == Role::Owner || new_role == Role::Banned {
            return Err(Error::InvalidRequest { reason: "owner/banned are not directly assignable".into() });
        }
        if actor == target {
            return Err(Error::Forbidden);
        }
        let actor_role = self.require_role(tenant_id, actor, Role::Admin)?;
        let mut membership = self.repo.get_membership(tenant_id, target).ok_or(Error::NotFound)?;
        if actor_role <= membership.role {
            return Err(Error::Forbidden);
        }
        membership.role = new_role;
        self.repo.put_membership(membership.clone());
        Ok(membership)
    }

    /// **RemoveMember** (kick). Requires `actor.role > target.role` and
    /// `actor.role >= admin`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub fn remove_member(&self, tenant_id: TenantId, actor: UserId, target: UserId) -> Result<()> {
        let actor_role = self.require_role(tenant_id, actor, Role::Admin)?;
        let membership = self.repo.get_membership(tenant_id, target).ok_or(Error::NotFound)?;
        if actor_role <= membership.role {
            return Err(Error::Forbidden);
        }
        self.repo.remove_membership(tenant_id, target);
        Ok(())
    }

    /// **BanMember**. Requires `actor.role > target.role` and
    /// `actor.role >= admin`; preserves history as a role transition
    /// rather than deleting the row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub fn ban_member(&self, tenant_id: TenantId, actor: UserId, target: UserId) -> Result<TenantMembership> {
        let actor_role = self.require_role(tenant_id, actor, Role::Admin)?;
        let mut membership = self.repo.get_membership(tenant_id, target).ok_or(Error::NotFound)?;
        if actor_role <= membership.role {
            return Err(Error::Forbidden);
        }
        membership.role = Role::Banned;
        membership.banned_at = Some(Utc::now());
        membership.banned_by = Some(actor);
        self.repo.put_membership(membership.clone());
        Ok(membership)
    }

    /// **UnbanMember**. Clears the ban; the user must rejoin explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the target isn't currently banned,
    /// or [`Error::Forbidden`].
    pub fn unban_member(&self, tenant_id: TenantId, actor: UserId, target: UserId) -> Result<()> {
        self.require_role(tenant_id, actor, Role::Admin)?;
        let membership = self.repo.get_membership(tenant_id, target).ok_or(Error::NotFound)?;
        if !membership.is_banned() {
            return Err(Error::NotFound);
        }
        self.repo.remove_membership(tenant_id, target);
        Ok(())
    }

    /// **ListBannedMembers**. Requires admin role or above.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if `actor` is below admin.
    pub fn list_banned_members(&self, tenant_id: TenantId, actor: UserId) -> Result<Vec<TenantMembership>> {
        self.require_role(tenant_id, actor, Role::Admin)?;
        Ok(self.repo.list_memberships(tenant_id).into_iter().filter(TenantMembership::is_banned).collect())
    }

    /// **CreateInvite**. `uses_max = 0` means unlimited uses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if `actor` is below admin.
    pub fn create_invite(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        ttl_seconds: Option<i64>,
        uses_max: u32,
    ) -> Result<Invite> {
        self.require_role(tenant_id, actor, Role::Admin)?;
        let ttl = ttl_seconds.unwrap_or(DEFAULT_INVITE_TTL_SECS);
        let invite = Invite {
            token: generate_invite_token(),
            tenant_id,
            created_by: actor,
            expires_at: Utc::now() + Duration::seconds(ttl),
            uses_max,
            uses_left: uses_max,
            revoked_at: None,
        };
        self.repo.create_invite(invite)
    }

    /// **ListInvites**. Requires admin role or above.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if `actor` is below admin.
    pub fn list_invites(&self, tenant_id: TenantId, actor: UserId) -> Result<Vec<Invite>> {
        self.require_role(tenant_id, actor, Role::Admin)?;
        Ok(self.repo.list_invites(tenant_id))
    }

    /// **RevokeInvite**. Requires admin role or above.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub fn revoke_invite(&self, tenant_id: TenantId, actor: UserId, token: &str) -> Result<()> {
        self.require_role(tenant_id, actor, Role::Admin)?;
        let mut invite = self.repo.get_invite(token).filter(|i| i.tenant_id == tenant_id).ok_or(Error::NotFound)?;
        invite.revoked_at = Some(Utc::now());
        self.repo.update_invite(invite)?;
        Ok(())
    }

    /// **CreateAnnouncement**. Requires moderator role or above.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if `actor` is below moderator.
    pub fn create_announcement(&self, tenant_id: TenantId, actor: UserId, body: &str, pinned: bool) -> Result<Announcement> {
        self.require_role(tenant_id, actor, Role::Moderator)?;
        let now = Utc::now();
        let announcement = Announcement {
            id: Uuid::new_v4(),
            tenant_id,
            author_id: actor,
            body: body.to_string(),
            pinned,
            created_at: now,
            updated_at: now,
        };
        self.repo.create_announcement(announcement)
    }

    /// **GetAnnouncements**. Pinned announcements sort first; requires
    /// the caller to be a current, non-banned member.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if `actor` is not a member.
    pub fn get_announcements(&self, tenant_id: TenantId, actor: UserId) -> Result<Vec<Announcement>> {
        self.require_role(tenant_id, actor, Role::Member)?;
        Ok(self.repo.list_announcements(tenant_id))
    }

    /// **UpdateAnnouncement**. Requires authorship or moderator role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub fn update_announcement(&self, tenant_id: TenantId, actor: UserId, id: Uuid, body: &str) -> Result<Announcement> {
        let mut announcement =
            self.repo.get_announcement(id).filter(|a| a.tenant_id == tenant_id).ok_or(Error::NotFound)?;
        let actor_role = self.role_of(tenant_id, actor).ok_or(Error::Forbidden)?;
        if announcement.author_id != actor && actor_role < Role::Moderator {
            return Err(Error::Forbidden);
        }
        announcement.body = body.to_string();
        announcement.updated_at = Utc::now();
        self.repo.update_announcement(announcement)
    }

    /// **DeleteAnnouncement**. Requires authorship or moderator role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub fn delete_announcement(&self, tenant_id: TenantId, actor: UserId, id: Uuid) -> Result<()> {
        let announcement = self.repo.get_announcement(id).filter(|a| a.tenant_id == tenant_id).ok_or(Error::NotFound)?;
        let actor_role = self.role_of(tenant_id, actor).ok_or(Error::Forbidden)?;
        if announcement.author_id != actor && actor_role < Role::Moderator {
            return Err(Error::Forbidden);
        }
        self.repo.delete_announcement(id)
    }

    /// **CheckTenantPermission(required_role)**.
    #[must_use]
    pub fn check_tenant_permission(&self, tenant_id: TenantId, user_id: UserId, required_role: Role) -> bool {
        self.role_of(tenant_id, user_id).is_some_and(|role| role >= required_role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTenantRepository;

    fn service() -> TenantService<InMemoryTenantRepository> {
        TenantService::new(InMemoryTenantRepository::new())
    }

    #[test]
    fn owner_is_created_on_tenant_creation() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        assert!(svc.check_tenant_permission(tenant.id, owner, Role::Owner));
    }

    #[test]
    fn password_tenant_requires_password_to_create() {
        let svc = service();
        let err = svc.create_tenant("acme", Visibility::Public, AccessType::Password, None, 0, UserId::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn open_join_is_idempotent() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        let user = UserId::new();
        let first = svc.join_tenant(tenant.id, user, None).unwrap();
        assert!(first.created);
        let second = svc.join_tenant(tenant.id, user, None).unwrap();
        assert!(!second.created);
    }

    #[test]
    fn password_join_requires_matching_password() {
        let svc = service();
        let owner = UserId::new();
        let tenant =
            svc.create_tenant("acme", Visibility::Public, AccessType::Password, Some("hunter2"), 0, owner).unwrap();
        let user = UserId::new();
        assert!(matches!(svc.join_tenant(tenant.id, user, Some("wrong")), Err(Error::InvalidCredentials)));
        assert!(svc.join_tenant(tenant.id, user, Some("hunter2")).is_ok());
    }

    #[test]
    fn invite_only_join_tenant_rejects_without_code() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::InviteOnly, None, 0, owner).unwrap();
        let err = svc.join_tenant(tenant.id, UserId::new(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn invite_code_joins_and_decrements_uses() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::InviteOnly, None, 0, owner).unwrap();
        let invite = svc.create_invite(tenant.id, owner, None, 1).unwrap();
        let user = UserId::new();
        let outcome = svc.join_by_code(&invite.token, user).unwrap();
        assert!(outcome.created);
        let err = svc.join_by_code(&invite.token, UserId::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn max_members_is_enforced() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 1, owner).unwrap();
        svc.join_tenant(tenant.id, UserId::new(), None).unwrap();
        let err = svc.join_tenant(tenant.id, UserId::new(), None).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn role_strict_order_blocks_peer_ban() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        let admin_a = UserId::new();
        let admin_b = UserId::new();
        svc.join_tenant(tenant.id, admin_a, None).unwrap();
        svc.join_tenant(tenant.id, admin_b, None).unwrap();
        svc.update_member_role(tenant.id, owner, admin_a, Role::Admin).unwrap();
        svc.update_member_role(tenant.id, owner, admin_b, Role::Admin).unwrap();
        let err = svc.ban_member(tenant.id, admin_a, admin_b).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn self_demotion_is_forbidden() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        let admin = UserId::new();
        svc.join_tenant(tenant.id, admin, None).unwrap();
        svc.update_member_role(tenant.id, owner, admin, Role::Admin).unwrap();
        let err = svc.update_member_role(tenant.id, admin, admin, Role::Member).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn ban_then_rejoin_is_blocked_until_unbanned() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        let user = UserId::new();
        svc.join_tenant(tenant.id, user, None).unwrap();
        svc.ban_member(tenant.id, owner, user).unwrap();
        assert!(matches!(svc.join_tenant(tenant.id, user, None), Err(Error::UserBanned)));
        svc.unban_member(tenant.id, owner, user).unwrap();
        assert!(svc.join_tenant(tenant.id, user, None).is_ok());
    }

    #[test]
    fn only_owner_may_delete_tenant() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        let other = UserId::new();
        svc.join_tenant(tenant.id, other, None).unwrap();
        svc.update_member_role(tenant.id, owner, other, Role::Admin).unwrap();
        assert!(matches!(svc.delete_tenant(tenant.id, other, false), Err(Error::Forbidden)));
    }

    #[test]
    fn delete_requires_cascade_with_remaining_members() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        svc.join_tenant(tenant.id, UserId::new(), None).unwrap();
        assert!(matches!(svc.delete_tenant(tenant.id, owner, false), Err(Error::Forbidden)));
        assert!(svc.delete_tenant(tenant.id, owner, true).is_ok());
    }

    #[test]
    fn public_listing_excludes_private_and_unlisted() {
        let svc = service();
        svc.create_tenant("alpha", Visibility::Public, AccessType::Open, None, 0, UserId::new()).unwrap();
        svc.create_tenant("beta", Visibility::Private, AccessType::Open, None, 0, UserId::new()).unwrap();
        svc.create_tenant("gamma", Visibility::Unlisted, AccessType::Open, None, 0, UserId::new()).unwrap();
        let (page, _) = svc.list_public_tenants(None, None, 10).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "alpha");
    }

    #[test]
    fn listing_search_is_case_insensitive() {
        let svc = service();
        svc.create_tenant("Acme Corp", Visibility::Public, AccessType::Open, None, 0, UserId::new()).unwrap();
        let (page, _) = svc.list_public_tenants(None, Some("ACME"), 10).unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn invalid_cursor_is_rejected() {
        let svc = service();
        let err = svc.list_public_tenants(Some("not a cursor"), None, 10).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn announcement_requires_moderator() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        let member = UserId::new();
        svc.join_tenant(tenant.id, member, None).unwrap();
        assert!(matches!(
            svc.create_announcement(tenant.id, member, "hi", false),
            Err(Error::Forbidden)
        ));
        assert!(svc.create_announcement(tenant.id, owner, "hi", true).is_ok());
    }

    #[test]
    fn pinned_announcements_sort_first() {
        let svc = service();
        let owner = UserId::new();
        let tenant = svc.create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner).unwrap();
        svc.create_announcement(tenant.id, owner, "unpinned", false).unwrap();
        svc.create_announcement(tenant.id, owner, "pinned", true).unwrap();
        let items = svc.get_announcements(tenant.id, owner).unwrap();
        assert!(items[0].pinned);
    }
}
