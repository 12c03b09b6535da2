//! Converts the Peer Provisioning Engine's desired state into WireGuard
//! peer configs and drives the reconciler tick loop (`spec.md` §4.8).

use std::sync::Arc;
use std::time::Duration;

use gc_wireguard::keys::PublicKey;
use gc_wireguard::{AllowedIp, Endpoint, WireGuardPeer};
use tracing::{info, warn};

use crate::state::AppState;

/// Build a [`WireGuardPeer`] from a provisioned peer row, or `None` if its
/// stored public key no longer decodes (`spec.md` §4.8 step 2: invalid
/// peers are skipped, not fatal to the tick).
fn to_wireguard_peer(peer: &gc_peers::Peer) -> Option<WireGuardPeer> {
    let public_key = match PublicKey::from_base64(&peer.public_key) {
        Ok(key) => key,
        Err(e) => {
            warn!(peer_id = %peer.id, error = %e, "skipping peer with invalid public key");
            return None;
        }
    };
    let allowed_ip = match AllowedIp::from_cidr(&format!("{}/32", peer.allowed_ip)) {
        Ok(ip) => ip,
        Err(e) => {
            warn!(peer_id = %peer.id, error = %e, "skipping peer with invalid allowed ip");
            return None;
        }
    };

    let mut wg_peer = WireGuardPeer::new(public_key).with_allowed_ip(allowed_ip);
    if let Some(keepalive) = peer.persistent_keepalive {
        wg_peer = wg_peer.with_persistent_keepalive(keepalive);
    }
    if let Some(endpoint) = &peer.endpoint {
        match endpoint.parse() {
            Ok(addr) => wg_peer = wg_peer.with_endpoint(Endpoint::new(addr)),
            Err(e) => warn!(peer_id = %peer.id, %endpoint, error = %e, "ignoring unparseable peer endpoint"),
        }
    }
    Some(wg_peer)
}

async fn tick(state: &AppState) {
    let desired: Vec<WireGuardPeer> = state.peers.list_all_enabled().iter().filter_map(to_wireguard_peer).collect();
    let mut reconciler = state.reconciler.lock().await;
    match reconciler.sync_peers(&desired).await {
        Ok(outcome) if outcome.added > 0 || outcome.updated > 0 || outcome.removed > 0 => {
            info!(
                added = outcome.added,
                updated = outcome.updated,
                removed = outcome.removed,
                skipped_invalid = outcome.skipped_invalid,
                "reconciled wireguard interface"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "wireguard reconcile tick failed"),
    }
}

/// Run forever, reconciling on a fixed interval and whenever
/// [`AppState::reconcile_notify`] wakes the loop early after a peer-row
/// mutation (`spec.md` §4.8 run mode (a) and (b)).
pub async fn run(state: Arc<AppState>, tick_interval: Duration) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => tick(&state).await,
            () = state.reconcile_notify.notified() => tick(&state).await,
        }
    }
}
