//! Core types for the tenant service (`spec.md` §3).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Create a new random `TenantId`.
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

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user, local to this crate. Agreement with
/// `gc-auth::UserId` is structural: both wrap the same `Uuid` rather than
/// sharing a type, so this crate has no compile-time dependency on
/// `gc-auth` (`SPEC_FULL.md` crate-decoupling note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new random `UserId`.
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

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who may discover a tenant via [`crate::service::TenantService::list_public_tenants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Listed for anyone.
    Public,
    /// Joinable with a link but not listed.
    Unlisted,
    /// Invisible outside the membership.
    Private,
}

/// How a user may join a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Anyone may join directly.
    Open,
    /// Joining requires the tenant password.
    Password,
    /// Joining requires a valid [`Invite`].
    InviteOnly,
}

/// A tenant: the top-level isolation boundary (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant identifier.
    pub id: TenantId,
    /// Display name, unique is not required at this layer.
    pub name: String,
    /// Discovery visibility.
    pub visibility: Visibility,
    /// Join gate.
    pub access_type: AccessType,
    /// Required when `access_type == Password`.
    pub password_hash: Option<String>,
    /// Maximum number of non-owner members, enforced atomically on join.
    pub max_members: u32,
    /// The single, immortal owner.
    pub owner_user_id: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Total ordering on membership roles (`spec.md` §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Banned: below every other role, blocks rejoin.
    Banned,
    /// Ordinary member.
    Member,
    /// Announcement and chat moderation.
    Moderator,
    /// Invite/role/ban management.
    Admin,
    /// Tenant deletion; exactly one per tenant; immortal.
    Owner,
}

/// A (user, tenant) membership record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMembership {
    /// Member's user id.
    pub user_id: UserId,
    /// Tenant the membership belongs to.
    pub tenant_id: TenantId,
    /// Current role, including `banned`.
    pub role: Role,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
    /// When the ban was issued, if currently banned.
    pub banned_at: Option<DateTime<Utc>>,
    /// Who issued the ban, if currently banned.
    pub banned_by: Option<UserId>,
}

impl TenantMembership {
    /// A fresh, non-banned membership stamped `joined_at = now`.
    #[must_use]
    pub fn new(user_id: UserId, tenant_id: TenantId, role: Role) -> Self {
        Self { user_id, tenant_id, role, joined_at: Utc::now(), banned_at: None, banned_by: None }
    }

    /// Whether this membership currently blocks rejoin.
    #[must_use]
    pub fn is_banned(&self) -> bool {
        self.role == Role::Banned
    }
}

/// An opaque, single- or multi-use tenant invite token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    /// Opaque token value, unique across all invites.
    pub token: String,
    /// Tenant the invite joins into.
    pub tenant_id: TenantId,
    /// Who minted the invite.
    pub created_by: UserId,
    /// Expiry; an expired invite is invalid regardless of `uses_left`.
    pub expires_at: DateTime<Utc>,
    /// `0` means unlimited uses.
    pub uses_max: u32,
    /// Remaining uses; decremented atomically on each successful join.
    pub uses_left: u32,
    /// Set when explicitly revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Invite {
    /// Whether this invite may still be redeemed.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now && (self.uses_max == 0 || self.uses_left > 0)
    }
}

/// A pinned-or-not tenant-wide announcement (`SPEC_FULL.md` §3
/// supplement: author + pinned flag for `ListAnnouncements` ordering).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    /// Unique announcement id.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Author, must hold at least `Moderator` at creation time.
    pub author_id: UserId,
    /// Announcement body.
    pub body: String,
    /// Pinned announcements sort first in `ListAnnouncements`.
    pub pinned: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last edit time.
    pub updated_at: DateTime<Utc>,
}

/// A partial update to a tenant (`UpdateTenant`, `spec.md` §4.2). `None`
/// fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TenantPatch {
    /// New display name.
    pub name: Option<String>,
    /// New discovery visibility.
    pub visibility: Option<Visibility>,
    /// New join gate. Switching to `Password` requires `new_password`.
    pub access_type: Option<AccessType>,
    /// New join password, hashed before storage. Required when
    /// `access_type` is being set to [`AccessType::Password`].
    pub new_password: Option<String>,
    /// New member cap.
    pub max_members: Option<u32>,
}

/// An opaque pagination cursor for [`crate::service::TenantService::list_public_tenants`].
///
/// Encodes the last-seen `(name, id)` pair so listing is stable under
/// concurrent inserts; callers must treat the string as opaque.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub(crate) last_name: String,
    pub(crate) last_id: TenantId,
}

impl Cursor {
    /// Encode as an opaque, URL-safe string.
    #[must_use]
    pub fn encode(&self) -> String {
        base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            format!("{}\u{1}{}", self.last_name, self.last_id),
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
        let (name, id) = raw
            .split_once('\u{1}')
            .ok_or_else(|| crate::error::Error::InvalidRequest { reason: "malformed cursor".into() })?;
        let id = Uuid::parse_str(id)
            .map_err(|_| crate::error::Error::InvalidRequest { reason: "malformed cursor".into() })?;
        Ok(Self { last_name: name.to_string(), last_id: TenantId::from_uuid(id) })
    }
}
