//! Membership Engine for GoConnect: network join/approval/ban state
//! machine and invite tokens (`spec.md` §4.4).
//!
//! ```
//! use gc_membership::{
//!     InMemoryMembershipRepository, JoinOutcome, JoinPolicy, MembershipService, NetworkId,
//!     NetworkInfo, NetworkLookup, NoopMembershipNotifier, NoopPeerProvisioner, TenantId, UserId,
//! };
//!
//! struct OneOpenNetwork(NetworkId, TenantId);
//! impl NetworkLookup for OneOpenNetwork {
//!     fn lookup(&self, network_id: NetworkId) -> Option<NetworkInfo> {
//!         (network_id == self.0).then_some(NetworkInfo { tenant_id: self.1, join_policy: JoinPolicy::Open })
//!     }
//! }
//!
//! let network_id = NetworkId::from_uuid(uuid::Uuid::new_v4());
//! let tenant_id = TenantId::from_uuid(uuid::Uuid::new_v4());
//! let user_id = UserId::from_uuid(uuid::Uuid::new_v4());
//!
//! let service = MembershipService::new(
//!     InMemoryMembershipRepository::new(),
//!     OneOpenNetwork(network_id, tenant_id),
//!     NoopPeerProvisioner,
//!     NoopMembershipNotifier,
//! );
//!
//! let outcome = service.join_network(network_id, user_id, tenant_id, "req-1", None).unwrap();
//! assert!(matches!(outcome, JoinOutcome::Membership(_)));
//! assert!(service.is_member(network_id, user_id));
//! ```

pub mod error;
pub mod ports;
pub mod repository;
pub mod service;
pub mod types;

pub use error::{Error, Result};
pub use ports::{MembershipNotifier, NoopMembershipNotifier, NoopPeerProvisioner, PeerProvisioner};
pub use repository::{InMemoryMembershipRepository, JoinPolicy, MembershipRepository, NetworkInfo, NetworkLookup};
pub use service::MembershipService;
pub use types::{
    JoinOutcome, JoinRequest, JoinRequestState, NetworkId, NetworkInvite, NetworkMembership, Role, Status,
    TenantId, UserId,
};
