//! Tenant persistence port.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Announcement, Invite, Tenant, TenantId, TenantMembership, UserId};

/// Capability set a concrete store must provide for
/// [`crate::service::TenantService`]. An in-memory implementation
/// ([`InMemoryTenantRepository`]) satisfies the same contract as a
/// persistent one (`spec.md` §9, "Polymorphism").
pub trait TenantRepository: Send + Sync {
    /// Insert a brand-new tenant.
    fn create_tenant(&self, tenant: Tenant) -> Result<Tenant>;
    /// Fetch a tenant by id, regardless of visibility (callers enforce
    /// tenant-isolation rewriting to [`Error::NotFound`] themselves).
    fn get_tenant(&self, id: TenantId) -> Option<Tenant>;
    /// Replace a previously created tenant in full.
    fn update_tenant(&self, tenant: Tenant) -> Result<Tenant>;
    /// Remove a tenant and all rows owned by it.
    fn delete_tenant(&self, id: TenantId) -> Result<()>;
    /// All tenants with `visibility = public`, for listing/search/paginate.
    fn list_public_tenants(&self) -> Vec<Tenant>;

    /// Fetch a membership row, if any (including banned).
    fn get_membership(&self, tenant_id: TenantId, user_id: UserId) -> Option<TenantMembership>;
    /// Insert or replace a membership row.
    fn put_membership(&self, membership: TenantMembership);
    /// Delete a membership row entirely (used by kick/leave, not ban).
    fn remove_membership(&self, tenant_id: TenantId, user_id: UserId);
    /// All membership rows for a tenant, including banned.
    fn list_memberships(&self, tenant_id: TenantId) -> Vec<TenantMembership>;

    /// Insert a new invite; token must be unique.
    fn create_invite(&self, invite: Invite) -> Result<Invite>;
    /// Fetch an invite by its opaque token.
    fn get_invite(&self, token: &str) -> Option<Invite>;
    /// Replace a previously created invite (use-count decrement, revoke).
    fn update_invite(&self, invite: Invite) -> Result<Invite>;
    /// All invites minted for a tenant.
    fn list_invites(&self, tenant_id: TenantId) -> Vec<Invite>;

    /// Insert a new announcement.
    fn create_announcement(&self, announcement: Announcement) -> Result<Announcement>;
    /// Fetch an announcement by id.
    fn get_announcement(&self, id: Uuid) -> Option<Announcement>;
    /// Replace a previously created announcement.
    fn update_announcement(&self, announcement: Announcement) -> Result<Announcement>;
    /// Delete an announcement.
    fn delete_announcement(&self, id: Uuid) -> Result<()>;
    /// All announcements for a tenant, pinned first.
    fn list_announcements(&self, tenant_id: TenantId) -> Vec<Announcement>;
}

#[derive(Default)]
struct Store {
    tenants: HashMap<TenantId, Tenant>,
    memberships: HashMap<(TenantId, UserId), TenantMembership>,
    invites: HashMap<String, Invite>,
    announcements: HashMap<Uuid, Announcement>,
}

/// In-memory [`TenantRepository`], backing property tests and local
/// development.
#[derive(Default)]
pub struct InMemoryTenantRepository {
    store: RwLock<Store>,
}

impl InMemoryTenantRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantRepository for InMemoryTenantRepository {
    fn create_tenant(&self, tenant: Tenant) -> Result<Tenant> {
        let mut store = self.store.write();
        store.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    fn get_tenant(&self, id: TenantId) -> Option<Tenant> {
        self.store.read().tenants.get(&id).cloned()
    }

    fn update_tenant(&self, tenant: Tenant) -> Result<Tenant> {
        let mut store = self.store.write();
        if !store.tenants.contains_key(&tenant.id) {
            return Err(Error::NotFound);
        }
        store.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    fn delete_tenant(&self, id: TenantId) -> Result<()> {
        let mut store = self.store.write();
        if store.tenants.remove(&id).is_none() {
            return Err(Error::NotFound);
        }
        store.memberships.retain(|(t, _), _| *t != id);
        store.invites.retain(|_, inv| inv.tenant_id != id);
        store.announcements.retain(|_, a| a.tenant_id != id);
        Ok(())
    }

    fn list_public_tenants(&self) -> Vec<Tenant> {
        self.store
            .read()
            .tenants
            .values()
            .filter(|t| t.visibility == crate::types::Visibility::Public)
            .cloned()
            .collect()
    }

    fn get_membership(&self, tenant_id: TenantId, user_id: UserId) -> Option<TenantMembership> {
        self.store.read().memberships.get(&(tenant_id, user_id)).cloned()
    }

    fn put_membership(&self, membership: TenantMembership) {
        let mut store = self.store.write();
        store.memberships.insert((membership.tenant_id, membership.user_id), membership);
    }

    fn remove_membership(&self, tenant_id: TenantId, user_id: UserId) {
        self.store.write().memberships.remove(&(tenant_id, user_id));
    }

    fn list_memberships(&self, tenant_id: TenantId) -> Vec<TenantMembership> {
        self.store.read().memberships.values().filter(|m| m.tenant_id == tenant_id).cloned().collect()
    }

    fn create_invite(&self, invite: Invite) -> Result<Invite> {
        let mut store = self.store.write();
        if store.invites.contains_key(&invite.token) {
            return Err(Error::Internal { reason: "invite token collision".into() });
        }
        store.invites.insert(invite.token.clone(), invite.clone());
        Ok(invite)
    }

    fn get_invite(&self, token: &str) -> Option<Invite> {
        self.store.read().invites.get(token).cloned()
    }

    fn update_invite(&self, invite: Invite) -> Result<Invite> {
        let mut store = self.store.write();
        if !store.invites.contains_key(&invite.token) {
            return Err(Error::NotFound);
        }
        store.invites.insert(invite.token.clone(), invite.clone());
        Ok(invite)
    }

    fn list_invites(&self, tenant_id: TenantId) -> Vec<Invite> {
        self.store.read().invites.values().filter(|i| i.tenant_id == tenant_id).cloned().collect()
    }

    fn create_announcement(&self, announcement: Announcement) -> Result<Announcement> {
        let mut store = self.store.write();
        store.announcements.insert(announcement.id, announcement.clone());
        Ok(announcement)
    }

    fn get_announcement(&self, id: Uuid) -> Option<Announcement> {
        self.store.read().announcements.get(&id).cloned()
    }

    fn update_announcement(&self, announcement: Announcement) -> Result<Announcement> {
        let mut store = self.store.write();
        if !store.announcements.contains_key(&announcement.id) {
            return Err(Error::NotFound);
        }
        store.announcements.insert(announcement.id, announcement.clone());
        Ok(announcement)
    }

    fn delete_announcement(&self, id: Uuid) -> Result<()> {
        let mut store = self.store.write();
        if store.announcements.remove(&id).is_none() {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn list_announcements(&self, tenant_id: TenantId) -> Vec<Announcement> {
        let mut items: Vec<Announcement> =
            self.store.read().announcements.values().filter(|a| a.tenant_id == tenant_id).cloned().collect();
        items.sort_by(|a, b| b.pinned.cmp(&a.pinned).then(b.created_at.cmp(&a.created_at)));
        items
    }
}
