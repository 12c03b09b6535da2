//! # gc-events
//!
//! The Real-Time Event Bus (`spec.md` §4.10): one persistent connection
//! per authenticated user, logical subscription rooms (`host`,
//! `network:<id>`, or an implicit per-user room), bounded per-session
//! outbound queues with eviction on overflow, and eviction on
//! authorization drift (kick/ban).
//!
//! ```rust
//! use gc_events::{OutboundEnvelope, OutboundType, RoomId, SessionRegistry, UserId};
//!
//! let registry = SessionRegistry::new();
//! let user_id = UserId::from_uuid(uuid::Uuid::new_v4());
//! let (session_id, mut outbound_rx, _control_rx) = registry.register(user_id);
//! registry.join_room(session_id, RoomId::Host);
//!
//! let delivered = registry.publish(RoomId::Host, OutboundEnvelope::event(OutboundType::NetUpdated, serde_json::json!({"name": "prod"})));
//! assert_eq!(delivered, 1);
//! assert!(outbound_rx.try_recv().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ports;
pub mod registry;
pub mod session;
pub mod types;

pub use error::{Error, Result};
pub use ports::{AllowAllAuthorizer, InboundHandler, NoopInboundHandler, RoomAuthorizer, RoomPublisher};
pub use registry::{
    ControlMessage, ControlReceiver, ControlSender, EvictReason, OutboundReceiver, OutboundSender, SessionRegistry,
    OUTBOUND_QUEUE_CAPACITY,
};
pub use session::{
    encode_outbound, parse_inbound, run_session, ws_message_size, SessionDeps, IDLE_TIMEOUT, MAX_INBOUND_BYTES,
    PING_INTERVAL,
};
pub use types::{
    ErrorBody, InboundEnvelope, InboundType, NetworkId, OutboundEnvelope, OutboundType, RoomId, SessionId, UserId,
};
