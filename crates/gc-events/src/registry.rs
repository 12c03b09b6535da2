//! Live-connection registry: sessions and room membership.
//!
//! `spec.md` §9 ("Concurrency primitives") calls for "a lock-free
//! concurrent map with per-session state machines"; this in-process
//! stand-in uses a sharded-by-concern `parking_lot::RwLock` instead (one
//! lock over the session table, one over the room index), which gives
//! the same read-mostly characteristics without a lock-free dependency
//! the rest of the workspace does not otherwise need.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ports::RoomPublisher;
use crate::types::{OutboundEnvelope, RoomId, SessionId, UserId};

/// Capacity of a session's outbound queue (`spec.md` §4.10: "each
/// session has a bounded outbound queue; on overflow the session is
/// closed"). 256 events comfortably absorbs a burst of chat/presence
/// fan-out between two ping ticks without masking a genuinely stuck
/// connection.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Capacity of a session's control queue (eviction notices). These are
/// rare and never produced faster than they are drained.
const CONTROL_QUEUE_CAPACITY: usize = 8;

/// Sender half of a session's outbound data channel.
pub type OutboundSender = mpsc::Sender<OutboundEnvelope>;
/// Receiver half of a session's outbound data channel, owned by the
/// connection's write task.
pub type OutboundReceiver = mpsc::Receiver<OutboundEnvelope>;

/// Why a session was forcibly evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// The outbound queue overflowed (`spec.md` §4.10 backpressure rule).
    QueueOverflow,
    /// A membership backing a subscribed room was revoked (kick/ban;
    /// `spec.md` §4.10 "Authorization drift").
    MembershipRevoked,
}

impl EvictReason {
    /// Diagnostic message sent to the client in the closing error frame.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::QueueOverflow => "disconnected: outbound queue overflow",
            Self::MembershipRevoked => "disconnected: membership revoked",
        }
    }
}

/// A control-plane instruction delivered to a session's connection task
/// out-of-band from ordinary event data.
#[derive(Debug, Clone, Copy)]
pub enum ControlMessage {
    /// Close the connection with the given reason.
    Evict(EvictReason),
}

/// Sender half of a session's control channel.
pub type ControlSender = mpsc::Sender<ControlMessage>;
/// Receiver half of a session's control channel.
pub type ControlReceiver = mpsc::Receiver<ControlMessage>;

struct SessionHandle {
    user_id: UserId,
    outbound: OutboundSender,
    control: ControlSender,
    rooms: HashSet<RoomId>,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<SessionId, SessionHandle>,
    by_user: HashMap<UserId, HashSet<SessionId>>,
}

#[derive(Default)]
struct Rooms {
    members: HashMap<RoomId, HashSet<SessionId>>,
}

/// Tracks every live connection and the rooms each is subscribed to, and
/// fans out events to room subscribers.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<Sessions>,
    rooms: RwLock<Rooms>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `user_id`, returning its id and the
    /// receiver halves the connection task should drain.
    pub fn register(&self, user_id: UserId) -> (SessionId, OutboundReceiver, ControlReceiver) {
        let session_id = SessionId::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE_CAPACITY);

        let mut sessions = self.sessions.write();
        sessions.by_id.insert(
            session_id,
            SessionHandle { user_id, outbound: outbound_tx, control: control_tx, rooms: HashSet::new() },
        );
        sessions.by_user.entry(user_id).or_default().insert(session_id);

        debug!(%session_id, %user_id, "session registered");
        (session_id, outbound_rx, control_rx)
    }

    /// Remove a session and prune it from every room it had joined.
    /// Idempotent: removing an already-removed session is a no-op.
    pub fn remove(&self, session_id: SessionId) {
        let removed = {
            let mut sessions = self.sessions.write();
            let Some(handle) = sessions.by_id.remove(&session_id) else {
                return;
            };
            if let Some(set) = sessions.by_user.get_mut(&handle.user_id) {
                set.remove(&session_id);
                if set.is_empty() {
                    sessions.by_user.remove(&handle.user_id);
                }
            }
            handle
        };

        if !removed.rooms.is_empty() {
            let mut rooms = self.rooms.write();
            for room in &removed.rooms {
                if let Some(set) = rooms.members.get_mut(room) {
                    set.remove(&session_id);
                    if set.is_empty() {
                        rooms.members.remove(room);
                    }
                }
            }
        }
        debug!(%session_id, "session removed");
    }

    /// Subscribe a session to a room. The caller is responsible for
    /// authorization (`gc-server` checks `RoomAuthorizer` before calling
    /// this).
    pub fn join_room(&self, session_id: SessionId, room: RoomId) {
        let mut sessions = self.sessions.write();
        if let Some(handle) = sessions.by_id.get_mut(&session_id) {
            handle.rooms.insert(room);
        } else {
            return;
        }
        drop(sessions);
        self.rooms.write().members.entry(room).or_default().insert(session_id);
    }

    /// Unsubscribe a session from a room.
    pub fn leave_room(&self, session_id: SessionId, room: RoomId) {
        let mut sessions = self.sessions.write();
        if let Some(handle) = sessions.by_id.get_mut(&session_id) {
            handle.rooms.remove(&room);
        } else {
            return;
        }
        drop(sessions);
        let mut rooms = self.rooms.write();
        if let Some(set) = rooms.members.get_mut(&room) {
            set.remove(&session_id);
            if set.is_empty() {
                rooms.members.remove(&room);
            }
        }
    }

    /// Fan out `envelope` to every session subscribed to `room`. A
    /// session whose outbound queue is full is evicted rather than
    /// allowed to back-pressure the whole room (`spec.md` §4.10).
    /// Returns the number of sessions the event was actually queued to.
    pub fn publish(&self, room: RoomId, envelope: OutboundEnvelope) -> usize {
        let members: Vec<SessionId> = {
            let rooms = self.rooms.read();
            match rooms.members.get(&room) {
                Some(set) => set.iter().copied().collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        let mut overflowed = Vec::new();
        {
            let sessions = self.sessions.read();
            for session_id in members {
                let Some(handle) = sessions.by_id.get(&session_id) else { continue };
                match handle.outbound.try_send(envelope.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => overflowed.push(session_id),
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
        }

        for session_id in overflowed {
            warn!(%session_id, %room, "outbound queue overflow, evicting session");
            self.evict_session(session_id, EvictReason::QueueOverflow);
        }
        delivered
    }

    /// Evict every session held by `user_id` (`spec.md` §4.10,
    /// "Authorization drift": kick/ban must close any streams the user
    /// holds on the revoked room). Returns the number of sessions evicted.
    pub fn evict_user(&self, user_id: UserId, reason: EvictReason) -> usize {
        let session_ids: Vec<SessionId> = {
            let sessions = self.sessions.read();
            sessions.by_user.get(&user_id).map(|set| set.iter().copied().collect()).unwrap_or_default()
        };
        for session_id in &session_ids {
            self.evict_session(*session_id, reason);
        }
        session_ids.len()
    }

    fn evict_session(&self, session_id: SessionId, reason: EvictReason) {
        let control = {
            let sessions = self.sessions.read();
            sessions.by_id.get(&session_id).map(|h| h.control.clone())
        };
        if let Some(control) = control {
            let _ = control.try_send(ControlMessage::Evict(reason));
        }
        self.remove(session_id);
    }

    /// Number of live sessions, for tests and diagnostics.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().by_id.len()
    }

    /// Number of sessions subscribed to `room`, for tests and diagnostics.
    #[must_use]
    pub fn room_size(&self, room: RoomId) -> usize {
        self.rooms.read().members.get(&room).map_or(0, HashSet::len)
    }
}

impl RoomPublisher for SessionRegistry {
    fn publish(&self, room: RoomId, envelope: OutboundEnvelope) {
        let _ = Self::publish(self, room, envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NetworkId, OutboundType};

    fn user() -> UserId {
        UserId::from_uuid(uuid::Uuid::new_v4())
    }

    #[test]
    fn register_and_remove_prunes_rooms() {
        let registry = SessionRegistry::new();
        let (session_id, _out, _ctrl) = registry.register(user());
        let room = RoomId::Host;

        registry.join_room(session_id, room);
        assert_eq!(registry.room_size(room), 1);

        registry.remove(session_id);
        assert_eq!(registry.room_size(room), 0);
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn publish_delivers_to_room_members_only() {
        let registry = SessionRegistry::new();
        let (a, mut a_rx, _ac) = registry.register(user());
        let (b, mut b_rx, _bc) = registry.register(user());
        let network = RoomId::Network(NetworkId::from_uuid(uuid::Uuid::new_v4()));

        registry.join_room(a, RoomId::Host);
        registry.join_room(b, network);

        let delivered = registry.publish(RoomId::Host, OutboundEnvelope::event(OutboundType::NetUpdated, serde_json::json!({})));
        assert_eq!(delivered, 1);
        assert!(a_rx.try_recv().is_ok());
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn overflowing_queue_evicts_session() {
        let registry = SessionRegistry::new();
        let (session_id, mut outbound_rx, mut control_rx) = registry.register(user());
        registry.join_room(session_id, RoomId::Host);

        for _ in 0..OUTBOUND_QUEUE_CAPACITY {
            registry.publish(RoomId::Host, OutboundEnvelope::event(OutboundType::PresenceUpdate, serde_json::json!({})));
        }
        assert_eq!(registry.session_count(), 1);

        registry.publish(RoomId::Host, OutboundEnvelope::event(OutboundType::PresenceUpdate, serde_json::json!({})));
        assert_eq!(registry.session_count(), 0);
        assert!(matches!(control_rx.try_recv(), Ok(ControlMessage::Evict(EvictReason::QueueOverflow))));

        drop(outbound_rx);
    }

    #[test]
    fn evict_user_closes_every_session_and_clears_rooms() {
        let registry = SessionRegistry::new();
        let u = user();
        let (s1, _o1, mut c1) = registry.register(u);
        let (s2, _o2, mut c2) = registry.register(u);
        let room = RoomId::Network(NetworkId::from_uuid(uuid::Uuid::new_v4()));
        registry.join_room(s1, room);
        registry.join_room(s2, room);

        let evicted = registry.evict_user(u, EvictReason::MembershipRevoked);
        assert_eq!(evicted, 2);
        assert_eq!(registry.room_size(room), 0);
        assert_eq!(registry.session_count(), 0);
        assert!(matches!(c1.try_recv(), Ok(ControlMessage::Evict(EvictReason::MembershipRevoked))));
        assert!(matches!(c2.try_recv(), Ok(ControlMessage::Evict(EvictReason::MembershipRevoked))));
    }
}
