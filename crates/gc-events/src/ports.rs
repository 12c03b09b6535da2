//! Collaborator ports consumed by the event bus.
//!
//! `gc-events` never depends on `gc-membership`, `gc-chat`, or `gc-auth`
//! directly (`DESIGN.md` crate-decoupling note): it authorizes room
//! subscriptions and dispatches domain-specific inbound frames through
//! these narrow traits, and `gc-server` wires in the concrete
//! implementations.

use crate::types::{InboundEnvelope, OutboundEnvelope, RoomId, UserId};

/// Whether a user may subscribe to a room (`spec.md` §4.10: "Server MUST
/// verify the user is an approved member of the target room before
/// admitting subscription"). `gc-server` implements this by delegating to
/// `gc-tenancy`/`gc-membership`: `host` requires active tenant membership,
/// `network:<id>` requires approved network membership, and `user:<id>`
/// is authorized only for that user's own sessions.
pub trait RoomAuthorizer: Send + Sync {
    /// True if `user_id` may join `room`.
    fn is_authorized(&self, user_id: UserId, room: RoomId) -> bool;
}

/// A [`RoomAuthorizer`] that admits every subscription, for tests and
/// standalone use of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllAuthorizer;

impl RoomAuthorizer for AllowAllAuthorizer {
    fn is_authorized(&self, _user_id: UserId, _room: RoomId) -> bool {
        true
    }
}

/// Handles the domain-specific inbound frame types this crate does not
/// own the semantics of (`auth.refresh`, `chat.*`). Frames the bus owns
/// outright (`room.join`/`room.leave`/`presence.ping`) are handled
/// in-process and never reach this trait.
pub trait InboundHandler: Send + Sync {
    /// Process one inbound frame on behalf of `user_id` and produce the
    /// frame to send back (an `ack`/echo on success, an `error` frame on
    /// failure — this trait does not itself return [`crate::Error`] so a
    /// domain failure is always visible to the caller as a normal reply).
    fn handle(&self, user_id: UserId, envelope: &InboundEnvelope) -> OutboundEnvelope;
}

/// An [`InboundHandler`] that rejects every domain frame, for tests and
/// standalone use of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInboundHandler;

impl InboundHandler for NoopInboundHandler {
    fn handle(&self, _user_id: UserId, envelope: &InboundEnvelope) -> OutboundEnvelope {
        OutboundEnvelope::error(Some(envelope.op_id.clone()), "InternalServer", "no handler configured")
    }
}

/// Extension point so other crates' notifier ports (`gc-chat::ChatNotifier`,
/// a future membership notifier) can publish onto the bus without
/// depending on [`crate::registry::SessionRegistry`] directly.
///
/// [`crate::registry::SessionRegistry`] implements this trait, so
/// `gc-server` can hand an `Arc<SessionRegistry>` to a `ChatNotifier`
/// adapter without either crate naming the other.
pub trait RoomPublisher: Send + Sync {
    /// Fan out `envelope` to every session subscribed to `room`.
    fn publish(&self, room: RoomId, envelope: OutboundEnvelope);
}
