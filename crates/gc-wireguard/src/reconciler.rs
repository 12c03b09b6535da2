//! The WireGuard Reconciler (`spec.md` §4.8): keeps a single managed
//! interface equal to the authoritative peer set.
//!
//! The reconciler owns exactly one interface (there is one data-plane host
//! per deployment; `spec.md` §4.8 "no tenant filter"). It is handed the
//! full desired peer set on every call and diffs it against what the
//! interface currently reports, adding/updating/removing peers to reach
//! that set exactly. A second call with an unchanged peer set is a no-op
//! (property #6, idempotent convergence).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::PeerConfig;
use crate::error::Result;
use crate::interface::WireGuardInterface;
use crate::keys::PublicKey;
use crate::types::WireGuardPeer;

/// Outcome of a single [`Reconciler::sync_peers`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Peers added since the last sync.
    pub added: usize,
    /// Peers whose config changed and were re-applied.
    pub updated: usize,
    /// Peers removed because they are no longer in the desired set.
    pub removed: usize,
    /// Peers present in the input whose public key failed validation and
    /// were skipped (`spec.md` §4.8 step 2).
    pub skipped_invalid: usize,
}

impl SyncOutcome {
    /// Whether this sync changed anything on the interface.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.updated > 0 || self.removed > 0
    }
}

/// A snapshot of the reconciler's last run, for `/healthz`-style reporting
/// (`SPEC_FULL.md` §3 supplement — not wire-exposed by this crate).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerStatus {
    /// When `sync_peers` last completed, successfully or not.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Peers installed on the most recent successful run.
    pub last_peers_added: usize,
    /// Peers removed on the most recent successful run.
    pub last_peers_removed: usize,
    /// Consecutive failed runs since the last success; reset to 0 on success.
    pub consecutive_failures: u32,
}

/// Reconciles a desired peer set against a managed interface.
pub struct Reconciler<I: WireGuardInterface> {
    interface: I,
    interface_name: String,
    status: ReconcilerStatus,
}

impl<I: WireGuardInterface> Reconciler<I> {
    /// Build a reconciler over an already-created interface.
    #[must_use]
    pub fn new(interface: I, interface_name: impl Into<String>) -> Self {
        Self { interface, interface_name: interface_name.into(), status: ReconcilerStatus::default() }
    }

    /// The reconciler's last-run snapshot.
    #[must_use]
    pub fn status(&self) -> ReconcilerStatus {
        self.status.clone()
    }

    /// **`SyncPeers(peers)`**: install exactly the given peer set.
    ///
    /// Peers whose public key fails validation are filtered out rather
    /// than failing the whole batch (`spec.md` §4.8 step 2); `endpoint` is
    /// preserved when present and a keepalive of zero is treated as "don't
    /// set" (step 3).
    ///
    /// # Errors
    ///
    /// Returns the underlying interface error unmodified so the caller can
    /// retry on the next tick (`spec.md` §4.8, §5 timeouts).
    pub async fn sync_peers(&mut self, peers: &[WireGuardPeer]) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        let desired: HashMap<PublicKey, &WireGuardPeer> = peers
            .iter()
            .filter_map(|p| {
                if p.allowed_ips.is_empty() {
                    outcome.skipped_invalid += 1;
                    warn!(public_key = %p.public_key, "skipping peer with no allowed_ips");
                    None
                } else {
                    Some((p.public_key.clone(), p))
                }
            })
            .collect();

        let result = self.sync_peers_inner(&desired, &mut outcome).await;

        self.status.last_run_at = Some(Utc::now());
        match &result {
            Ok(()) => {
                self.status.last_peers_added = outcome.added;
                self.status.last_peers_removed = outcome.removed;
                self.status.consecutive_failures = 0;
            }
            Err(_) => self.status.consecutive_failures += 1,
        }

        result.map(|()| outcome)
    }

    async fn sync_peers_inner(
        &mut self,
        desired: &HashMap<PublicKey, &WireGuardPeer>,
        outcome: &mut SyncOutcome,
    ) -> Result<()> {
        let current = self.interface.get_status(&self.interface_name).await?;
        let current_keys: HashMap<PublicKey, _> =
            current.peers.iter().map(|p| (p.public_key.clone(), p)).collect();

        for (key, status) in &current_keys {
            if !desired.contains_key(key) {
                self.interface.remove_peer(&self.interface_name, key).await?;
                outcome.removed += 1;
                info!(public_key = %key, "removed stale peer");
            }
            let _ = status;
        }

        for (key, peer) in desired {
            let config = to_peer_config(peer)?;
            match current_keys.get(key) {
                None => {
                    self.interface.add_peer(&self.interface_name, &config).await?;
                    outcome.added += 1;
                }
                Some(existing) => {
                    if peer_changed(existing, peer) {
                        self.interface.remove_peer(&self.interface_name, key).await?;
                        self.interface.add_peer(&self.interface_name, &config).await?;
                        outcome.updated += 1;
                    }
                }
            }
        }

        Ok(())
    }
}

fn to_peer_config(peer: &WireGuardPeer) -> Result<PeerConfig> {
    let mut builder = crate::config::PeerConfigBuilder::new().public_key(peer.public_key.clone());
    for ip in &peer.allowed_ips {
        builder = builder.allowed_ip(&ip.to_cidr())?;
    }
    if let Some(endpoint) = &peer.endpoint {
        builder = builder.endpoint(&endpoint.to_string())?;
    }
    // A zero keepalive means "don't set" (`spec.md` §4.8 step 3).
    if let Some(keepalive) = peer.persistent_keepalive {
        if keepalive > 0 {
            builder = builder.persistent_keepalive(keepalive);
        }
    }
    if let Some(psk) = peer.preshared_key.clone() {
        builder = builder.preshared_key(psk);
    }
    builder.build()
}

fn peer_changed(existing: &crate::types::PeerStatus, desired: &WireGuardPeer) -> bool {
    existing.allowed_ips != desired.allowed_ips || existing.endpoint != desired.endpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::FakeWireGuardInterface;
    use crate::keys::KeyPair;
    use crate::types::AllowedIp;

    async fn fresh_interface(name: &str) -> FakeWireGuardInterface {
        let iface = FakeWireGuardInterface::new();
        let private = crate::keys::PrivateKey::generate();
        let config = crate::config::InterfaceConfig::new(private);
        let mut iface_mut = iface.clone();
        WireGuardInterface::create(&mut iface_mut, name, &config).await.unwrap();
        iface
    }

    fn peer_with_ip(ip: &str) -> WireGuardPeer {
        let keypair = KeyPair::generate();
        WireGuardPeer::new(keypair.public_key().clone())
            .with_allowed_ip(AllowedIp::from_cidr(ip).unwrap())
    }

    #[tokio::test]
    async fn first_sync_adds_every_peer() {
        let iface = fresh_interface("gcwg-test-1").await;
        let mut reconciler = Reconciler::new(iface, "gcwg-test-1");
        let peers = vec![peer_with_ip("10.1.0.2/32"), peer_with_ip("10.1.0.3/32")];
        let outcome = reconciler.sync_peers(&peers).await.unwrap();
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.removed, 0);
    }

    #[tokio::test]
    async fn status_tracks_last_run() {
        let iface = fresh_interface("gcwg-test-status").await;
        let mut reconciler = Reconciler::new(iface, "gcwg-test-status");
        assert!(reconciler.status().last_run_at.is_none());

        let peers = vec![peer_with_ip("10.1.0.2/32")];
        reconciler.sync_peers(&peers).await.unwrap();

        let status = reconciler.status();
        assert!(status.last_run_at.is_some());
        assert_eq!(status.last_peers_added, 1);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn second_sync_with_same_set_is_a_no_op() {
        let iface = fresh_interface("gcwg-test-2").await;
        let mut reconciler = Reconciler::new(iface, "gcwg-test-2");
        let peers = vec![peer_with_ip("10.1.0.2/32")];
        reconciler.sync_peers(&peers).await.unwrap();
        let second = reconciler.sync_peers(&peers).await.unwrap();
        assert!(!second.has_changes());
    }

    #[tokio::test]
    async fn removed_peer_is_pruned_on_next_sync() {
        let iface = fresh_interface("gcwg-test-3").await;
        let mut reconciler = Reconciler::new(iface, "gcwg-test-3");
        let keep = peer_with_ip("10.1.0.2/32");
        let drop_me = peer_with_ip("10.1.0.3/32");
        reconciler.sync_peers(&[keep.clone(), drop_me]).await.unwrap();
        let outcome = reconciler.sync_peers(&[keep]).await.unwrap();
        assert_eq!(outcome.removed, 1);
    }

    #[tokio::test]
    async fn peer_with_no_allowed_ips_is_skipped() {
        let iface = fresh_interface("gcwg-test-4").await;
        let mut reconciler = Reconciler::new(iface, "gcwg-test-4");
        let invalid = WireGuardPeer::new(KeyPair::generate().public_key().clone());
        let outcome = reconciler.sync_peers(&[invalid]).await.unwrap();
        assert_eq!(outcome.skipped_invalid, 1);
        assert_eq!(outcome.added, 0);
    }
}
