//! The idempotency store: replay-safe guards for mutating calls.
//!
//! Every state-mutating service operation is called with an
//! `Idempotency-Key` (see `spec.md` §6). The store lets a caller reserve a
//! key before doing the real work, then complete it with the response that
//! work produced. A concurrent or retried caller with the same key either
//! blocks on (in this in-memory implementation, observes) the in-flight
//! reservation or replays the stored response once it lands.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::error::{IdempotencyError, Result};

/// Opaque digest of a request's contents, used to detect key reuse with a
/// different payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of any serializable request payload.
    ///
    /// Two calls with equal `request` values produce equal fingerprints
    /// regardless of field order at the type level, since serialization is
    /// deterministic for a fixed Rust type.
    #[must_use]
    pub fn of(request: &impl Serialize) -> Self {
        let bytes = serde_json::to_vec(request).unwrap_or_default();
        Self(*blake3::hash(&bytes).as_bytes())
    }

    /// Build a fingerprint directly from raw bytes (for callers that
    /// already have a canonical byte representation).
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }
}

/// State of a single key's reservation.
#[derive(Debug, Clone)]
enum Slot {
    /// A call with this key is in flight; its result has not landed yet.
    Pending { fingerprint: Fingerprint },
    /// A call with this key completed; its response is cached.
    Done {
        fingerprint: Fingerprint,
        response: Value,
        created_at: DateTime<Utc>,
    },
}

/// Outcome of reserving a key via [`IdempotencyStore::begin`].
#[derive(Debug, Clone)]
pub enum Outcome {
    /// This is the first time the key has been seen (or the prior
    /// reservation never completed); the caller must perform the
    /// operation and call [`IdempotencyStore::complete`].
    Fresh,
    /// The key already completed with an identical fingerprint; the
    /// caller must return this response unchanged rather than repeating
    /// the operation.
    Replayed(Value),
    /// A call with this key is currently in flight.
    InFlight,
}

/// Replay-safe guard for mutating operations, keyed by client-supplied
/// idempotency key.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl InMemoryIdempotencyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `key` for a request with the given `fingerprint`.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyError::Conflict`] if `key` was already used
    /// (in-flight or completed) with a different fingerprint.
    pub fn begin(&self, key: &str, fingerprint: Fingerprint) -> Result<Outcome> {
        let mut slots = self.slots.write();
        match slots.get(key) {
            None => {
                slots.insert(key.to_string(), Slot::Pending { fingerprint });
                Ok(Outcome::Fresh)
            }
            Some(Slot::Pending { fingerprint: existing }) => {
                if *existing == fingerprint {
                    Ok(Outcome::InFlight)
                } else {
                    Err(IdempotencyError::Conflict { key: key.to_string() })
                }
            }
            Some(Slot::Done { fingerprint: existing, response, .. }) => {
                if *existing == fingerprint {
                    Ok(Outcome::Replayed(response.clone()))
                } else {
                    Err(IdempotencyError::Conflict { key: key.to_string() })
                }
            }
        }
    }

    /// Record the response for a key previously reserved with
    /// [`Self::begin`], so future calls with the same fingerprint replay it.
    pub fn complete(&self, key: &str, fingerprint: Fingerprint, response: &impl Serialize) {
        let value = serde_json::to_value(response).unwrap_or(Value::Null);
        let mut slots = self.slots.write();
        slots.insert(
            key.to_string(),
            Slot::Done { fingerprint, response: value, created_at: Utc::now() },
        );
    }

    /// Release a reservation without recording a result, e.g. because the
    /// underlying operation failed and should be retryable under the same
    /// key.
    pub fn abandon(&self, key: &str) {
        let mut slots = self.slots.write();
        if matches!(slots.get(key), Some(Slot::Pending { .. })) {
            slots.remove(key);
        }
    }

    /// Number of keys currently tracked (pending or completed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether the store has no tracked keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct CreateNetworkRequest {
        name: String,
        cidr: String,
    }

    #[test]
    fn fresh_key_allows_the_call_through() {
        let store = InMemoryIdempotencyStore::new();
        let fp = Fingerprint::of(&CreateNetworkRequest { name: "n1".into(), cidr: "10.0.0.0/24".into() });
        assert!(matches!(store.begin("k1", fp).unwrap(), Outcome::Fresh));
    }

    #[test]
    fn same_key_same_fingerprint_replays_response() {
        let store = InMemoryIdempotencyStore::new();
        let req = CreateNetworkRequest { name: "n1".into(), cidr: "10.0.0.0/24".into() };
        let fp = Fingerprint::of(&req);

        assert!(matches!(store.begin("k1", fp).unwrap(), Outcome::Fresh));
        store.complete("k1", fp, &"network-id-123");

        match store.begin("k1", fp).unwrap() {
            Outcome::Replayed(value) => assert_eq!(value, Value::from("network-id-123")),
            other => panic!("expected replay, got {other:?}"),
        }
    }

    #[test]
    fn same_key_different_fingerprint_conflicts() {
        let store = InMemoryIdempotencyStore::new();
        let req_a = CreateNetworkRequest { name: "n1".into(), cidr: "10.0.0.0/24".into() };
        let req_b = CreateNetworkRequest { name: "n2".into(), cidr: "10.0.0.0/24".into() };

        let fp_a = Fingerprint::of(&req_a);
        store.begin("k1", fp_a).unwrap();
        store.complete("k1", fp_a, &"ok");

        let fp_b = Fingerprint::of(&req_b);
        let err = store.begin("k1", fp_b).unwrap_err();
        assert!(matches!(err, IdempotencyError::Conflict { .. }));
    }

    #[test]
    fn in_flight_reservation_is_reported_without_reserving_twice() {
        let store = InMemoryIdempotencyStore::new();
        let fp = Fingerprint::of(&"noop");
        assert!(matches!(store.begin("k1", fp).unwrap(), Outcome::Fresh));
        assert!(matches!(store.begin("k1", fp).unwrap(), Outcome::InFlight));
    }

    #[test]
    fn abandon_allows_retry_under_same_key() {
        let store = InMemoryIdempotencyStore::new();
        let fp = Fingerprint::of(&"noop");
        store.begin("k1", fp).unwrap();
        store.abandon("k1");
        assert!(matches!(store.begin("k1", fp).unwrap(), Outcome::Fresh));
    }

    #[test]
    fn different_request_types_produce_different_fingerprints() {
        let a = Fingerprint::of(&CreateNetworkRequest { name: "a".into(), cidr: "10.0.0.0/24".into() });
        let b = Fingerprint::of(&CreateNetworkRequest { name: "b".into(), cidr: "10.0.0.0/24".into() });
        assert_ne!(a, b);
    }
}
