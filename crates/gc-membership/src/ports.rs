//! Collaborator ports consumed by the membership engine.
//!
//! `gc-membership` never depends on `gc-peers` or `gc-events` directly
//! (`DESIGN.md` crate-decoupling note): it calls these narrow traits
//! instead, and `gc-server` wires in the concrete implementations. Both
//! default to no-op so callers never need to null-check (`spec.md` §9,
//! "Polymorphism").

use crate::types::{NetworkId, UserId};

/// Triggers the Peer Provisioning Engine (`spec.md` §4.7) on membership
/// changes. Failures are swallowed by the membership engine itself
/// (`spec.md` §4.4: "non-fatal to collaborators"); this trait's methods
/// therefore do not return a `Result` the caller must handle — an
/// implementation that fails logs to the audit port on its own and lets
/// the periodic reconciler converge later.
pub trait PeerProvisioner: Send + Sync {
    /// Provision peers for every active device of `user_id` in
    /// `network_id`.
    fn provision(&self, network_id: NetworkId, user_id: UserId);

    /// Deprovision (disable) every peer `user_id` holds in `network_id`.
    fn deprovision(&self, network_id: NetworkId, user_id: UserId);
}

/// A [`PeerProvisioner`] that does nothing, for tests and for deployments
/// that wire the engine in later.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPeerProvisioner;

impl PeerProvisioner for NoopPeerProvisioner {
    fn provision(&self, _network_id: NetworkId, _user_id: UserId) {}
    fn deprovision(&self, _network_id: NetworkId, _user_id: UserId) {}
}

/// Real-time events the membership engine emits for the event bus
/// (`spec.md` §4.10) to fan out to room subscribers.
pub trait MembershipNotifier: Send + Sync {
    /// A member joined or was approved into a network.
    fn member_joined(&self, network_id: NetworkId, user_id: UserId);

    /// A member left, was kicked, or was banned from a network.
    fn member_left(&self, network_id: NetworkId, user_id: UserId);

    /// A join request is now pending an admin decision.
    fn join_pending(&self, network_id: NetworkId, user_id: UserId);

    /// A join request was approved.
    fn join_approved(&self, network_id: NetworkId, user_id: UserId);

    /// A join request was denied.
    fn join_denied(&self, network_id: NetworkId, user_id: UserId);
}

/// A [`MembershipNotifier`] that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMembershipNotifier;

impl MembershipNotifier for NoopMembershipNotifier {
    fn member_joined(&self, _network_id: NetworkId, _user_id: UserId) {}
    fn member_left(&self, _network_id: NetworkId, _user_id: UserId) {}
    fn join_pending(&self, _network_id: NetworkId, _user_id: UserId) {}
    fn join_approved(&self, _network_id: NetworkId, _user_id: UserId) {}
    fn join_denied(&self, _network_id: NetworkId, _user_id: UserId) {}
}
