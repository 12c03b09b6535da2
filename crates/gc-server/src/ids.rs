//! Bridges the per-crate ID newtypes together.
//!
//! Every domain crate defines its own local `UserId`/`TenantId`/... over
//! `uuid::Uuid` rather than sharing one (`DESIGN.md` crate-decoupling
//! note), so this is the only place in the workspace that needs to know
//! two differently-named types agree structurally. [`UuidId`] is a local
//! trait implemented here for each foreign type, which the orphan rule
//! allows even though `gc-server` owns neither the trait's other impls
//! nor (for most of them) the types themselves.

use uuid::Uuid;

/// A per-crate ID newtype that wraps a single `Uuid`.
pub trait UuidId: Copy {
    /// The underlying UUID.
    fn as_uuid(&self) -> Uuid;
    /// Wrap a raw UUID.
    fn from_uuid(id: Uuid) -> Self;
}

/// Convert between two crates' ID newtypes that wrap the same UUID.
#[must_use]
pub fn convert_id<Src: UuidId, Dst: UuidId>(id: Src) -> Dst {
    Dst::from_uuid(id.as_uuid())
}

macro_rules! impl_uuid_id {
    ($ty:ty) => {
        impl UuidId for $ty {
            fn as_uuid(&self) -> Uuid {
                Self::as_uuid(self)
            }
            fn from_uuid(id: Uuid) -> Self {
                Self::from_uuid(id)
            }
        }
    };
}

impl_uuid_id!(gc_auth::UserId);
impl_uuid_id!(gc_auth::TenantId);

impl_uuid_id!(gc_tenancy::UserId);
impl_uuid_id!(gc_tenancy::TenantId);

impl_uuid_id!(gc_network::UserId);
impl_uuid_id!(gc_network::TenantId);
impl_uuid_id!(gc_network::NetworkId);

impl_uuid_id!(gc_membership::UserId);
impl_uuid_id!(gc_membership::TenantId);
impl_uuid_id!(gc_membership::NetworkId);

impl_uuid_id!(gc_devices::UserId);
impl_uuid_id!(gc_devices::TenantId);
impl_uuid_id!(gc_devices::DeviceId);

impl_uuid_id!(gc_peers::UserId);
impl_uuid_id!(gc_peers::DeviceId);
// gc_peers::NetworkId re-exports gc_network::NetworkId directly (the
// Peer Provisioning Engine's one deliberate cross-crate dependency), so
// it already has an impl above.

impl_uuid_id!(gc_chat::UserId);
impl_uuid_id!(gc_chat::TenantId);
impl_uuid_id!(gc_chat::NetworkId);

impl_uuid_id!(gc_events::UserId);
impl_uuid_id!(gc_events::NetworkId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_foreign_type() {
        let raw = Uuid::new_v4();
        let membership_id = gc_membership::UserId::from_uuid(raw);
        let chat_id: gc_chat::UserId = convert_id(membership_id);
        assert_eq!(chat_id.as_uuid(), raw);
    }
}
