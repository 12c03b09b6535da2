//! Collaborator ports consumed by the Chat Service.
//!
//! `gc-chat` never depends on `gc-tenancy` or `gc-events` directly
//! (`DESIGN.md` crate-decoupling note): it calls these narrow traits
//! instead, and `gc-server` wires in the concrete implementations.

use crate::types::{ChatMessage, TenantId, UserId};

/// The tenant-scoped role the caller needs for an authorization check
/// (`spec.md` §4.9). `gc-server` implements this by delegating to
/// `gc-tenancy::TenantService`.
pub trait RoleLookup: Send + Sync {
    /// The caller's role in `tenant_id`, or `None` if they are not a
    /// member at all.
    fn role_of(&self, tenant_id: TenantId, user_id: UserId) -> Option<crate::types::Role>;
}

/// A [`RoleLookup`] that treats every caller as an ordinary member, for
/// tests and standalone use of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllMembersRoleLookup;

impl RoleLookup for AllMembersRoleLookup {
    fn role_of(&self, _tenant_id: TenantId, _user_id: UserId) -> Option<crate::types::Role> {
        Some(crate::types::Role::Member)
    }
}

/// Real-time events the Chat Service emits for the event bus (`spec.md`
/// §4.10) to fan out to room subscribers.
pub trait ChatNotifier: Send + Sync {
    /// A message was sent, edited, soft-deleted, or redacted.
    fn message_changed(&self, message: &ChatMessage);
}

/// A [`ChatNotifier`] that does nothing, the default for standalone use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatNotifier;

impl ChatNotifier for NoopChatNotifier {
    fn message_changed(&self, _message: &ChatMessage) {}
}
