//! Idle alert auto-close sweep.
//!
//! An open alert whose track has produced no telemetry for the configured
//! idle window is resolved and a resolution event is broadcast.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::AppState;

const SWEEP_INTERVAL_SECS: u64 = 5;

pub async fn run_idle_close_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
    state.mark_loop_heartbeat("idle-close");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Idle-close loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                state.mark_loop_heartbeat("idle-close");
                sweep_once(&state).await;
            }
        }
    }
}

/// One sweep over the open-alert map.
pub async fn sweep_once(state: &AppState) {
    let idle_window = ChronoDuration::seconds(state.config().alert_idle_close_secs.max(1));
    let idle = state.deduper.take_idle(idle_window, Utc::now());
    if idle.is_empty() {
        return;
    }

    tracing::info!("Auto-closing {} idle alert(s)", idle.len());
    state.close_alerts(idle).await;
}
