//! OAuth2 device authorization grant (RFC 8628), used by headless and CLI
//! clients: the terminal displays `user_code`, the user approves from a
//! browser already holding a session, and the terminal polls until
//! approved.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::RngCore;

use crate::types::UserId;

/// Default TTL of an initiated flow (`spec.md` §4.1, §6).
pub const DEFAULT_TTL: Duration = Duration::minutes(10);
/// Suggested client poll interval (`spec.md` §6).
pub const POLL_INTERVAL_SECONDS: i64 = 5;

/// Alphabet for `user_code`: consonants and `2`-`9`, excluding vowels and
/// the visually ambiguous `I`/`O`/`0`/`1`.
const USER_CODE_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXYZ23456789";
const USER_CODE_GROUP_LEN: usize = 4;

fn random_user_code() -> String {
    let mut rng = rand::thread_rng();
    let group = |rng: &mut rand::rngs::ThreadRng| -> String {
        (0..USER_CODE_GROUP_LEN)
            .map(|_| *USER_CODE_ALPHABET.choose(rng).expect("alphabet is non-empty") as char)
            .collect()
    };
    format!("{}-{}", group(&mut rng), group(&mut rng))
}

fn random_device_code() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Outcome of [`DeviceFlowStore::poll`].
pub enum PollOutcome {
    /// Not yet approved; the client should sleep [`POLL_INTERVAL_SECONDS`]
    /// and retry.
    Pending,
    /// Approved; the flow is consumed and `user_id` may now be issued
    /// tokens by the caller.
    Approved {
        /// The user who approved the flow.
        user_id: UserId,
    },
    /// Unknown or TTL-expired device code.
    Expired,
}

#[derive(Debug, Clone)]
struct FlowRecord {
    client_id: String,
    user_code: String,
    expires_at: DateTime<Utc>,
    approved_by: Option<UserId>,
}

/// Process-wide store of in-flight device authorizations. Entries expire
/// after [`DEFAULT_TTL`]; a device code is removed the poll after it is
/// consumed (approved and collected), matching the legacy CLI's
/// single-collection semantics (`spec.md` §8, scenario S6).
#[derive(Debug, Default)]
pub struct DeviceFlowStore {
    by_device_code: RwLock<HashMap<String, FlowRecord>>,
    user_code_to_device_code: RwLock<HashMap<String, String>>,
}

/// A freshly initiated flow, returned to the client.
pub struct Initiated {
    /// Opaque code the client polls with.
    pub device_code: String,
    /// Short human-enterable code the user types into a browser.
    pub user_code: String,
    /// Seconds until the flow expires.
    pub expires_in: i64,
    /// Suggested poll interval in seconds.
    pub interval: i64,
}

impl DeviceFlowStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new flow for `client_id`.
    pub fn initiate(&self, client_id: &str) -> Initiated {
        let device_code = random_device_code();
        let user_code = random_user_code();
        let expires_at = Utc::now() + DEFAULT_TTL;

        self.by_device_code.write().insert(
            device_code.clone(),
            FlowRecord { client_id: client_id.to_string(), user_code: user_code.clone(), expires_at, approved_by: None },
        );
        self.user_code_to_device_code.write().insert(user_code.clone(), device_code.clone());

        Initiated {
            device_code,
            user_code,
            expires_in: DEFAULT_TTL.num_seconds(),
            interval: POLL_INTERVAL_SECONDS,
        }
    }

    /// Approve the flow identified by its `user_code` on behalf of
    /// `user_id`. The `user_code → device_code` mapping is deleted
    /// immediately so the human-entered code cannot be reused.
    ///
    /// Returns `false` if the code is unknown or already expired.
    pub fn approve(&self, user_code: &str, user_id: UserId) -> bool {
        let Some(device_code) = self.user_code_to_device_code.write().remove(user_code) else {
            return false;
        };
        let mut flows = self.by_device_code.write();
        let Some(record) = flows.get_mut(&device_code) else {
            return false;
        };
        if record.expires_at <= Utc::now() {
            flows.remove(&device_code);
            return false;
        }
        record.approved_by = Some(user_id);
        true
    }

    /// Poll the flow identified by `device_code`. Consumes (removes) the
    /// record once it reports [`PollOutcome::Approved`], so a second poll
    /// for the same code reports [`PollOutcome::Expired`].
    pub fn poll(&self, device_code: &str) -> PollOutcome {
        let mut flows = self.by_device_code.write();
        let Some(record) = flows.get(device_code) else {
            return PollOutcome::Expired;
        };
        if record.expires_at <= Utc::now() {
            flows.remove(device_code);
            self.user_code_to_device_code.write().remove(&record.user_code);
            return PollOutcome::Expired;
        }
        match record.approved_by {
            Some(user_id) => {
                flows.remove(device_code);
                PollOutcome::Approved { user_id }
            }
            None => PollOutcome::Pending,
        }
    }

    /// The client id a device code was initiated under, for audit/logging.
    #[must_use]
    pub fn client_id_for(&self, device_code: &str) -> Option<String> {
        self.by_device_code.read().get(device_code).map(|r| r.client_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_before_approval_is_pending() {
        let store = DeviceFlowStore::new();
        let initiated = store.initiate("cli");
        assert!(matches!(store.poll(&initiated.device_code), PollOutcome::Pending));
    }

    #[test]
    fn approve_then_poll_succeeds_once() {
        let store = DeviceFlowStore::new();
        let initiated = store.initiate("cli");
        let user_id = UserId::new();

        assert!(store.approve(&initiated.user_code, user_id));
        match store.poll(&initiated.device_code) {
            PollOutcome::Approved { user_id: polled } => assert_eq!(polled, user_id),
            _ => panic!("expected approved"),
        }

        assert!(matches!(store.poll(&initiated.device_code), PollOutcome::Expired));
    }

    #[test]
    fn unknown_device_code_is_expired() {
        let store = DeviceFlowStore::new();
        assert!(matches!(store.poll("nonexistent"), PollOutcome::Expired));
    }

    #[test]
    fn user_code_is_single_use() {
        let store = DeviceFlowStore::new();
        let initiated = store.initiate("cli");
        assert!(store.approve(&initiated.user_code, UserId::new()));
        assert!(!store.approve(&initiated.user_code, UserId::new()));
    }

    #[test]
    fn user_code_shape() {
        let store = DeviceFlowStore::new();
        let initiated = store.initiate("cli");
        assert_eq!(initiated.user_code.len(), USER_CODE_GROUP_LEN * 2 + 1);
        for c in initiated.user_code.chars().filter(|c| *c != '-') {
            assert!(USER_CODE_ALPHABET.contains(&(c as u8)), "unexpected char {c}");
        }
    }
}
