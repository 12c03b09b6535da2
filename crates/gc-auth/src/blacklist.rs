//! Token revocation blacklist.
//!
//! Tracks JTIs of tokens that must no longer validate even though their
//! signature and expiry are otherwise fine (logout, rotation on refresh).
//! The store is a process-wide collaborator acquired at startup (`spec.md`
//! §9, "Global mutable state"); its absence degrades validation, it never
//! fails it (`spec.md` §7).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// An entry recording why and until when a token is revoked.
#[derive(Debug, Clone)]
pub struct BlacklistEntry {
    /// Why the token was revoked (`"logout"`, `"refresh_rotation"`, ...).
    pub reason: String,
    /// When the entry may be forgotten (normally the token's own `exp`).
    pub expires_at: DateTime<Utc>,
}

/// The revocation port. Implementations are expected to be ephemeral
/// (in-memory or a TTL-capable key-value store); there is no durability
/// requirement beyond a token's own lifetime.
pub trait TokenBlacklist: Send + Sync {
    /// Revoke `jti` until `expires_at`.
    fn revoke(&self, jti: Uuid, reason: &str, expires_at: DateTime<Utc>);

    /// Whether `jti` is currently revoked.
    fn is_revoked(&self, jti: Uuid) -> bool;
}

/// In-memory blacklist, sharded by nothing (a single `RwLock` is adequate:
/// blacklist writes are rare relative to the read-on-every-validation
/// traffic, per `spec.md` §5).
#[derive(Debug, Default)]
pub struct InMemoryBlacklist {
    entries: RwLock<HashMap<Uuid, BlacklistEntry>>,
}

impl InMemoryBlacklist {
    /// Create an empty blacklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop entries whose `expires_at` has passed. Callers may run this
    /// periodically; `is_revoked` already treats expired entries as absent
    /// so correctness does not depend on sweeping.
    pub fn sweep(&self) {
        let now = Utc::now();
        self.entries.write().retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries currently tracked, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the blacklist has no tracked entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl TokenBlacklist for InMemoryBlacklist {
    fn revoke(&self, jti: Uuid, reason: &str, expires_at: DateTime<Utc>) {
        self.entries.write().insert(jti, BlacklistEntry { reason: reason.to_string(), expires_at });
    }

    fn is_revoked(&self, jti: Uuid) -> bool {
        match self.entries.read().get(&jti) {
            Some(entry) => entry.expires_at > Utc::now(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn revoked_jti_is_reported_until_expiry() {
        let store = InMemoryBlacklist::new();
        let jti = Uuid::new_v4();
        assert!(!store.is_revoked(jti));

        store.revoke(jti, "logout", Utc::now() + Duration::minutes(5));
        assert!(store.is_revoked(jti));
    }

    #[test]
    fn expired_entry_is_treated_as_not_revoked() {
        let store = InMemoryBlacklist::new();
        let jti = Uuid::new_v4();
        store.revoke(jti, "logout", Utc::now() - Duration::seconds(1));
        assert!(!store.is_revoked(jti));
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let store = InMemoryBlacklist::new();
        store.revoke(Uuid::new_v4(), "logout", Utc::now() - Duration::seconds(1));
        store.revoke(Uuid::new_v4(), "logout", Utc::now() + Duration::minutes(5));
        store.sweep();
        assert_eq!(store.len(), 1);
    }
}
