//! Rolling retention sweep.
//!
//! Removes track records older than the flight window and resolved alerts
//! older than the alert window. Unresolved alerts are never deleted.
//! Deletes run in short batches so writers are not starved.

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::persistence::{alerts as alerts_db, flights as flights_db};
use crate::state::AppState;

pub async fn run_retention_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let sweep_secs = state.config().retention_sweep_secs.max(1);
    let mut ticker = interval(Duration::from_secs(sweep_secs));
    state.mark_loop_heartbeat("retention");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Retention loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                state.mark_loop_heartbeat("retention");
                match sweep_once(&state).await {
                    Ok((flights, alerts)) if flights > 0 || alerts > 0 => {
                        tracing::info!(
                            "Retention sweep removed {} flights and {} resolved alerts",
                            flights,
                            alerts
                        );
                    }
                    Ok(_) => {}
                    // Re-attempted on the next tick.
                    Err(err) => tracing::error!("Retention sweep failed: {}", err),
                }
            }
        }
    }
}

/// One full sweep; returns (flights removed, alerts removed).
pub async fn sweep_once(state: &AppState) -> Result<(u64, u64)> {
    let config = state.config();
    let pool = state.database().pool();
    let batch = config.retention_batch_size.max(1);

    let flight_cutoff = Utc::now() - ChronoDuration::hours(config.flight_retention_hours);
    let mut flights_removed = 0u64;
    loop {
        let removed = flights_db::delete_flights_older_than(pool, flight_cutoff, batch).await?;
        flights_removed += removed;
        if removed < batch as u64 {
            break;
        }
    }

    let alert_cutoff = Utc::now() - ChronoDuration::days(config.alert_retention_days);
    let mut alerts_removed = 0u64;
    loop {
        let removed =
            alerts_db::delete_resolved_alerts_older_than(pool, alert_cutoff, batch).await?;
        alerts_removed += removed;
        if removed < batch as u64 {
            break;
        }
    }

    state.prune_snapshot(flight_cutoff);

    Ok((flights_removed, alerts_removed))
}
