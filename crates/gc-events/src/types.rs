//! Message envelopes and room identifiers for the real-time event bus
//! (`spec.md` §4.10).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A network identifier, scoped locally to this crate. Agrees
/// structurally (same underlying UUID) with `gc_network::NetworkId`
/// without a direct dependency (`DESIGN.md` crate-decoupling note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(Uuid);

impl NetworkId {
    /// Wrap a raw UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user on whose behalf a connection was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap a raw UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque per-connection identifier, distinct from the authenticated
/// user (one user may hold several concurrent connections).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a fresh session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A logical subscription channel (`spec.md` §4.10, "Room"): the
/// tenant-wide `host` channel, a single network's channel, or the
/// implicit channel scoped to one user (used for point-to-point
/// delivery of `admin.kick`/`admin.ban` and similar directed events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomId {
    /// Tenant-wide chat/announcement room.
    Host,
    /// A single network's room.
    Network(NetworkId),
    /// The implicit room containing only one user's own sessions.
    User(UserId),
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Network(id) => write!(f, "network:{id}"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

impl RoomId {
    /// Parse the wire form (`"host"`, `"network:<uuid>"`, `"user:<uuid>"`).
    pub fn parse(s: &str) -> Result<Self> {
        if s == "host" {
            return Ok(Self::Host);
        }
        if let Some(rest) = s.strip_prefix("network:") {
            let id = rest
                .parse::<Uuid>()
                .map_err(|_| Error::InvalidRequest("malformed room id".to_string()))?;
            return Ok(Self::Network(NetworkId::from_uuid(id)));
        }
        if let Some(rest) = s.strip_prefix("user:") {
            let id = rest
                .parse::<Uuid>()
                .map_err(|_| Error::InvalidRequest("malformed room id".to_string()))?;
            return Ok(Self::User(UserId::from_uuid(id)));
        }
        Err(Error::InvalidRequest(format!("unknown room: {s}")))
    }
}

/// The `type` discriminant of an inbound client frame (`spec.md` §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundType {
    /// Refresh the bearer token backing this connection without reconnecting.
    #[serde(rename = "auth.refresh")]
    AuthRefresh,
    /// Send a chat message.
    #[serde(rename = "chat.send")]
    ChatSend,
    /// Edit a previously sent chat message.
    #[serde(rename = "chat.edit")]
    ChatEdit,
    /// Delete a chat message.
    #[serde(rename = "chat.delete")]
    ChatDelete,
    /// Moderator redaction of a chat message.
    #[serde(rename = "chat.redact")]
    ChatRedact,
    /// Ephemeral typing indicator.
    #[serde(rename = "chat.typing")]
    ChatTyping,
    /// Subscribe to a room.
    #[serde(rename = "room.join")]
    RoomJoin,
    /// Unsubscribe from a room.
    #[serde(rename = "room.leave")]
    RoomLeave,
    /// Liveness probe from the client.
    #[serde(rename = "presence.ping")]
    PresencePing,
}

/// An inbound client frame: `{type, op_id, data}` (`spec.md` §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// The frame's type discriminant.
    #[serde(rename = "type")]
    pub kind: InboundType,
    /// Client-chosen correlation id, echoed back on the matching outbound
    /// frame so the client can match requests to responses.
    pub op_id: String,
    /// Type-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// The `type` discriminant of an outbound server frame (`spec.md` §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundType {
    /// Generic success acknowledgement of an inbound frame.
    Ack,
    /// Generic failure response to an inbound frame.
    Error,
    /// Echo of a sent/edited/deleted/redacted chat message.
    #[serde(rename = "chat.send")]
    ChatSend,
    /// Echo of a chat edit.
    #[serde(rename = "chat.edit")]
    ChatEdit,
    /// Echo of a chat deletion.
    #[serde(rename = "chat.delete")]
    ChatDelete,
    /// Echo of a moderator redaction.
    #[serde(rename = "chat.redact")]
    ChatRedact,
    /// Fan-out of another member's typing indicator.
    #[serde(rename = "chat.typing")]
    ChatTyping,
    /// A user joined a room this session is subscribed to.
    #[serde(rename = "member.joined")]
    MemberJoined,
    /// A user left a room this session is subscribed to.
    #[serde(rename = "member.left")]
    MemberLeft,
    /// A join request entered the pending state.
    #[serde(rename = "request.join.pending")]
    RequestJoinPending,
    /// A join request was approved.
    #[serde(rename = "request.join.approved")]
    RequestJoinApproved,
    /// A join request was denied.
    #[serde(rename = "request.join.denied")]
    RequestJoinDenied,
    /// The recipient was kicked from a network.
    #[serde(rename = "admin.kick")]
    AdminKick,
    /// The recipient was banned from a network.
    #[serde(rename = "admin.ban")]
    AdminBan,
    /// A network's metadata changed.
    #[serde(rename = "net.updated")]
    NetUpdated,
    /// A device came online.
    #[serde(rename = "device.online")]
    DeviceOnline,
    /// A device went offline.
    #[serde(rename = "device.offline")]
    DeviceOffline,
    /// Reply to a `presence.ping`.
    #[serde(rename = "presence.pong")]
    PresencePong,
    /// Fan-out of another session's presence change.
    #[serde(rename = "presence.update")]
    PresenceUpdate,
}

/// The `{code, message, details?}` error body of an outbound error frame
/// (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The domain error code.
    pub code: String,
    /// A human-readable message.
    pub message: String,
    /// Optional structured detail payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// An outbound server frame: `{type, op_id?, data?, error?}` (`spec.md` §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    /// The frame's type discriminant.
    #[serde(rename = "type")]
    pub kind: OutboundType,
    /// Echo of the triggering inbound frame's `op_id`, absent for
    /// server-initiated events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<String>,
    /// Type-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Present only on `type: "error"` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl OutboundEnvelope {
    /// Build a bare acknowledgement for `op_id`.
    #[must_use]
    pub fn ack(op_id: impl Into<String>) -> Self {
        Self { kind: OutboundType::Ack, op_id: Some(op_id.into()), data: None, error: None }
    }

    /// Build an error frame, optionally echoing an `op_id`.
    #[must_use]
    pub fn error(op_id: Option<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: OutboundType::Error,
            op_id,
            data: None,
            error: Some(ErrorBody { code: code.into(), message: message.into(), details: None }),
        }
    }

    /// Build a server-initiated event frame with no `op_id`.
    #[must_use]
    pub fn event(kind: OutboundType, data: serde_json::Value) -> Self {
        Self { kind, op_id: None, data: Some(data), error: None }
    }
}
