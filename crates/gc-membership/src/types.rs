//! Core types for the membership engine (`spec.md` §3, §4.4).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a network, local to this crate (see `DESIGN.md`
/// crate-decoupling note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(Uuid);

impl NetworkId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
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

/// Identifier of a tenant, local to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
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

/// Identifier of a user, local to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
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

/// Network-scoped role, totally ordered `Owner > Admin > Member`
/// (`spec.md` §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May view and join; may not administer.
    Member,
    /// May approve/deny/kick/ban and manage invites.
    Admin,
    /// The creator; immortal until the network is deleted.
    Owner,
}

/// A network membership row. Only ever [`Status::Approved`] or
/// [`Status::Banned`]; the `pending` state of `spec.md` §3 is represented
/// solely by an open [`JoinRequest`] (property #3: at most one of
/// {pending request, approved membership, banned membership}).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Authorized to receive peer provisioning.
    Approved,
    /// Blocked from rejoining until explicitly unbanned.
    Banned,
}

/// A (user, network) membership record (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMembership {
    /// The network.
    pub network_id: NetworkId,
    /// The member.
    pub user_id: UserId,
    /// Network-scoped role.
    pub role: Role,
    /// Approval/ban state.
    pub status: Status,
    /// When the member was first approved.
    pub joined_at: DateTime<Utc>,
    /// When a ban was imposed, if `status = banned`.
    pub banned_at: Option<DateTime<Utc>>,
    /// Who imposed the ban, if `status = banned`.
    pub banned_by: Option<UserId>,
}

/// State of a [`JoinRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestState {
    /// Awaiting an admin decision.
    Pending,
    /// An admin approved it.
    Approved,
    /// An admin denied it.
    Denied,
}

/// A pending (or decided) request to join an approval-gated network
/// (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Unique request id.
    pub id: Uuid,
    /// The target network.
    pub network_id: NetworkId,
    /// The requesting user.
    pub user_id: UserId,
    /// Current state.
    pub state: JoinRequestState,
    /// When the request was filed.
    pub requested_at: DateTime<Utc>,
    /// When an admin decided it, if they have.
    pub decided_at: Option<DateTime<Utc>>,
}

/// An opaque invite token scoped to a single network (`spec.md` §3).
/// Tenant-scoped invites are handled by `gc-tenancy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInvite {
    /// The opaque, unique token string.
    pub token: String,
    /// The network this invite grants access to.
    pub network_id: NetworkId,
    /// Who minted the invite.
    pub created_by: UserId,
    /// Expiry; invites past this are invalid regardless of `uses_left`.
    pub expires_at: DateTime<Utc>,
    /// `0` means unlimited uses.
    pub uses_max: u32,
    /// Remaining uses; decremented atomically on each successful use.
    pub uses_left: u32,
    /// When the invite was explicitly revoked, if it was.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl NetworkInvite {
    /// Whether this invite can currently be redeemed.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none()
            && self.expires_at > now
            && (self.uses_max == 0 || self.uses_left > 0)
    }
}

/// Outcome of [`crate::service::MembershipService::join_network`]: either
/// the resulting membership (open policy, or caller already approved) or a
/// pending join request (approval policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JoinOutcome {
    /// The caller is now (or already was) an approved member.
    Membership(NetworkMembership),
    /// A join request was created (or already existed) and awaits a
    /// decision.
    Requested(JoinRequest),
}
