//! Process entry point: builds [`AppState`] and runs the WebSocket
//! gateway alongside the reconciler and offline-sweep background tasks
//! (`SPEC_FULL.md` §2.3).

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use gc_server::config::ServerConfig;
use gc_server::error::Result;
use gc_server::{gateway, reconcile, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::new(&config).await?);

    let reconciler_task = tokio::spawn(reconcile::run(state.clone(), config.reconciler.tick_interval));
    let sweep_task = tokio::spawn(offline_sweep_loop(
        state.clone(),
        config.reconciler.offline_sweep_interval,
        config.reconciler.offline_threshold,
    ));

    let bind_addr = config.websocket.bind_addr;
    let max_connections = config.websocket.max_connections;
    let gateway_result = gateway::serve(state, bind_addr, max_connections).await;

    reconciler_task.abort();
    sweep_task.abort();
    gateway_result
}

/// Periodically flips devices that have missed their heartbeat window to
/// offline, across every tenant the gateway has seen a connection from
/// (`spec.md` §4.5: `DeviceOffline`).
async fn offline_sweep_loop(state: Arc<AppState>, interval: Duration, threshold: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let chrono_threshold = chrono::Duration::seconds(i64::try_from(threshold.as_secs()).unwrap_or(i64::MAX));

    loop {
        ticker.tick().await;
        let tenants: Vec<_> = state.known_tenants.read().iter().copied().collect();
        for tenant_id in tenants {
            let flipped = state.devices.sweep_offline(gc_devices::TenantId::from_uuid(tenant_id), chrono_threshold);
            if !flipped.is_empty() {
                info!(%tenant_id, count = flipped.len(), "offline sweep flipped devices");
            }
        }
    }
}
