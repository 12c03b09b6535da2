//! Core types for the Chat Service (`spec.md` §3, §4.9).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum message body length in bytes (`spec.md` §3, §4.9).
pub const MAX_BODY_BYTES: usize = 4096;

/// Unique identifier for a tenant, local to this crate (see `DESIGN.md`
/// crate-decoupling note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user, local to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
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

/// Unique identifier for a network, local to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(Uuid);

impl NetworkId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
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

/// Unique identifier for a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Create a new random `MessageId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Total ordering mirroring `gc_tenancy::Role`, duplicated per the
/// crate-decoupling note rather than imported: chat authorization checks
/// a user's tenant-wide role regardless of which scope they're posting
/// in (`spec.md` §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Banned: below every other role.
    Banned,
    /// Ordinary member; may send and edit/delete own messages.
    Member,
    /// May edit, delete, and redact anyone's messages.
    Moderator,
    /// Same chat privileges as moderator; included for totality with the
    /// tenant role ordering.
    Admin,
    /// Same chat privileges as moderator/admin.
    Owner,
}

impl Role {
    /// Whether this role may moderate other users' messages (edit,
    /// delete, redact) — `spec.md` §4.9: "moderator+".
    #[must_use]
    pub const fn is_moderator_or_above(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin | Self::Owner)
    }
}

/// Where a message was posted (`spec.md` §3, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Tenant-wide chat.
    Host,
    /// A single network's chat.
    Network(NetworkId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Network(id) => write!(f, "network:{id}"),
        }
    }
}

impl Scope {
    /// Parse the wire form (`"host"` or `"network:<uuid>"`, `spec.md` §3).
    ///
    /// # Errors
    ///
    /// Returns `Err(())` for anything else, including a malformed UUID
    /// after the `network:` prefix.
    pub fn parse(s: &str) -> Result<Self, ()> {
        if s == "host" {
            return Ok(Self::Host);
        }
        let id = s.strip_prefix("network:").ok_or(())?;
        Uuid::parse_str(id).map(|u| Self::Network(NetworkId::from_uuid(u))).map_err(|_| ())
    }
}

/// A single immutable edit-history record (`spec.md` §3: "Edit history
/// records retain `prev_body`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRecord {
    /// The message this edit belongs to.
    pub message_id: MessageId,
    /// The body immediately before this edit.
    pub prev_body: String,
    /// When the edit happened.
    pub edited_at: DateTime<Utc>,
}

/// A scoped chat message (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: MessageId,
    /// Where the message was posted.
    pub scope: Scope,
    /// The owning tenant (every scope, including network scopes, belongs
    /// to exactly one tenant).
    pub tenant_id: TenantId,
    /// The author.
    pub user_id: UserId,
    /// Current body. Replaced with `"[REDACTED]"` once `redacted = true`.
    pub body: String,
    /// Optional parent for threaded replies.
    pub parent_id: Option<MessageId>,
    /// Whether this message has been redacted.
    pub redacted: bool,
    /// Soft-deletion marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last edit time, if any.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Whether this message is visible to a normal list/read (not
    /// soft- or hard-deleted; hard-deleted rows are removed from the
    /// repository entirely and never reach this check).
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// An opaque pagination cursor for [`crate::service::ChatService::list_messages`].
#[derive(Debug, Clone)]
pub struct Cursor {
    pub(crate) last_created_at: DateTime<Utc>,
    pub(crate) last_id: MessageId,
}

impl Cursor {
    /// Encode as an opaque, URL-safe string.
    #[must_use]
    pub fn encode(&self) -> String {
        base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            format!("{}\u{1}{}", self.last_created_at.to_rfc3339(), self.last_id),
        )
    }

    /// Decode a cursor previously produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::InvalidRequest`] if the string is not
    /// a validly encoded cursor.
    pub fn decode(s: &str) -> crate::error::Result<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| crate::error::Error::InvalidRequest { reason: "malformed cursor".into() })?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| crate::error::Error::InvalidRequest { reason: "malformed cursor".into() })?;
        let (ts, id) = raw
            .split_once('\u{1}')
            .ok_or_else(|| crate::error::Error::InvalidRequest { reason: "malformed cursor".into() })?;
        let last_created_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| crate::error::Error::InvalidRequest { reason: "malformed cursor".into() })?
            .with_timezone(&Utc);
        let id = Uuid::parse_str(id)
            .map_err(|_| crate::error::Error::InvalidRequest { reason: "malformed cursor".into() })?;
        Ok(Self { last_created_at, last_id: MessageId::from_uuid(id) })
    }
}

/// A filter for [`crate::service::ChatService::list_messages`].
#[derive(Debug, Clone, Copy)]
pub struct ListFilter {
    /// Restrict to one scope.
    pub scope: Scope,
    /// Restrict to replies of one parent, if set.
    pub parent_id: Option<MessageId>,
}
