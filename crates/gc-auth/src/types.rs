//! Core types for the identity and token service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

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

/// Identifier of the tenant a user belongs to.
///
/// Defined locally (rather than imported from `gc-tenancy`) so this crate
/// has no compile-time dependency on the tenant service; the two agree by
/// construction since both wrap a `Uuid` minted by whichever service
/// creates the tenant.
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

/// How a user authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// Email + password, hashed locally.
    Password,
    /// Delegated to an external OIDC identity provider.
    Oidc,
}

/// A registered account.
///
/// Owned and mutated exclusively through [`crate::service::AuthService`];
/// callers never construct one directly outside tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Primary identifier.
    pub id: UserId,
    /// Unique login email.
    pub email: String,
    /// Argon2id hash of the password, absent for OIDC-only accounts.
    pub password_hash: Option<String>,
    /// Home tenant.
    pub tenant_id: TenantId,
    /// Platform-wide administrator flag.
    pub is_admin: bool,
    /// Platform-wide moderator flag.
    pub is_moderator: bool,
    /// Whether the account is suspended (cannot obtain tokens).
    pub suspended: bool,
    /// When the account was suspended, if it is.
    pub suspended_at: Option<DateTime<Utc>>,
    /// Why the account was suspended, if it is.
    pub suspended_reason: Option<String>,
    /// Whether TOTP second factor is enabled.
    pub two_factor_enabled: bool,
    /// Base32 TOTP secret, present only while 2FA is enabled.
    pub two_factor_secret: Option<String>,
    /// Salted hashes of unused recovery codes.
    pub recovery_codes: Vec<String>,
    /// How this user authenticates.
    pub auth_provider: AuthProvider,
    /// Subject identifier at the external provider, if `auth_provider` is
    /// [`AuthProvider::Oidc`].
    pub external_id: Option<String>,
    /// Locale supplied at registration.
    pub locale: Option<String>,
    /// Last time the user was seen active.
    pub last_seen: DateTime<Utc>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the account may currently obtain tokens.
    #[must_use]
    pub const fn can_authenticate(&self) -> bool {
        !self.suspended
    }
}

/// The token `type` claim; distinguishes access from refresh tokens so one
/// cannot be replayed as the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived, used to authorize API calls.
    Access,
    /// Long-lived, used only to mint a new access/refresh pair.
    Refresh,
}

/// Decoded and validated JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: UserId,
    /// Issuer, always `"goconnect"`.
    pub iss: String,
    /// Expiration, Unix seconds.
    pub exp: i64,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Unique token identifier, used for blacklisting.
    pub jti: Uuid,
    /// Access or refresh.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Home tenant of the subject.
    pub tenant_id: TenantId,
    /// Email of the subject, for convenience in downstream checks/logs.
    pub email: String,
    /// Whether the subject is a platform admin.
    pub is_admin: bool,
    /// Whether the subject is a platform moderator.
    pub is_moderator: bool,
}

/// An issued access/refresh pair, returned to the caller on every
/// successful authentication operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthBundle {
    /// Short-lived bearer token for API calls.
    pub access_token: String,
    /// Long-lived token used only to refresh.
    pub refresh_token: String,
    /// Seconds until `access_token` expires, for client convenience.
    pub expires_in: i64,
    /// The authenticated user's id.
    pub user_id: UserId,
}
