//! Shared application state: store handle, caches, deduper, and bus.

use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use skywatch_core::models::{Event, Flight};
use skywatch_core::ZoneGeometry;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bus::EventBus;
use crate::config::Config;
use crate::dedup::{AlertDeduper, DedupKey};
use crate::persistence::{alerts as alerts_db, flights as flights_db, regions as regions_db};
use crate::persistence::Database;

/// An active region with its geometry parsed once, off the hot path.
#[derive(Clone)]
pub struct CachedZone {
    pub id: i64,
    pub name: String,
    pub geometry: Arc<ZoneGeometry>,
}

pub struct AppState {
    database: Database,
    config: Config,
    /// Copy-on-write active-region cache, swapped whole on region CRUD.
    zones: RwLock<Arc<Vec<CachedZone>>>,
    /// Latest track per external identifier, for the fast dashboard query.
    latest: DashMap<String, Flight>,
    pub deduper: AlertDeduper,
    pub bus: EventBus,
    loop_heartbeats: DashMap<&'static str, u64>,
}

impl AppState {
    pub fn new(database: Database, config: Config) -> Self {
        let bus = EventBus::new(config.subscriber_queue_depth, config.subscriber_drop_grace);
        Self {
            database,
            config,
            zones: RwLock::new(Arc::new(Vec::new())),
            latest: DashMap::new(),
            deduper: AlertDeduper::new(),
            bus,
            loop_heartbeats: DashMap::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rebuild derived in-memory state from the store.
    pub async fn load_from_database(&self) -> Result<()> {
        self.reload_zones().await?;

        self.latest.clear();
        for flight in flights_db::latest_per_transponder(self.database.pool()).await? {
            self.latest
                .insert(flight.snapshot_key().to_string(), flight);
        }

        for open in alerts_db::load_open_alerts(self.database.pool()).await? {
            let key = DedupKey {
                ident: open.transponder_id,
                region_id: open.region_id.unwrap_or(0),
                severity: open.severity,
            };
            self.deduper.seed(key, open.id, open.last_seen);
        }

        tracing::info!(
            "Loaded {} snapshot tracks and {} open alerts from the store",
            self.latest.len(),
            self.deduper.open_count()
        );
        Ok(())
    }

    // ========== ACTIVE REGION CACHE ==========

    /// Rebuild the active-region cache from the store. Regions whose stored
    /// geometry no longer parses are skipped with a warning.
    pub async fn reload_zones(&self) -> Result<()> {
        let regions = regions_db::list_active_regions(self.database.pool()).await?;
        let mut cached = Vec::with_capacity(regions.len());
        for region in regions {
            match ZoneGeometry::parse(&region.polygon_json) {
                Ok(geometry) => cached.push(CachedZone {
                    id: region.id,
                    name: region.name,
                    geometry: Arc::new(geometry),
                }),
                Err(err) => {
                    tracing::warn!("Skipping region {} with bad geometry: {}", region.id, err);
                }
            }
        }

        if let Ok(mut guard) = self.zones.write() {
            *guard = Arc::new(cached);
        }
        Ok(())
    }

    /// Snapshot of the active-region cache.
    pub fn active_zones(&self) -> Arc<Vec<CachedZone>> {
        self.zones
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// First active region containing the point, if any.
    pub fn first_containing_zone(&self, lat: f64, lon: f64) -> Option<CachedZone> {
        self.active_zones()
            .iter()
            .find(|zone| zone.geometry.contains(lat, lon))
            .cloned()
    }

    // ========== LATEST-PER-IDENTIFIER SNAPSHOT ==========

    pub fn record_latest(&self, flight: Flight) {
        self.latest
            .insert(flight.snapshot_key().to_string(), flight);
    }

    /// Latest record per identifier, newest first, up to `limit`.
    pub fn latest_snapshot(&self, limit: usize) -> Vec<Flight> {
        let mut flights: Vec<Flight> = self.latest.iter().map(|r| r.value().clone()).collect();
        flights.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        flights.truncate(limit);
        flights
    }

    /// Drop snapshot entries older than the retention cutoff.
    pub fn prune_snapshot(&self, cutoff: DateTime<Utc>) {
        let stale: Vec<String> = self
            .latest
            .iter()
            .filter(|entry| entry.value().timestamp < cutoff)
            .map(|entry| entry.key().clone())
            .collect();
        for key in stale {
            self.latest.remove(&key);
        }
    }

    // ========== ALERT RESOLUTION ==========

    /// Resolve one open alert and broadcast the resolution.
    pub async fn close_alert(&self, alert_id: i64) -> Result<()> {
        let pool = self.database.pool();
        alerts_db::resolve_alert(pool, alert_id).await?;
        if let Some(alert) = alerts_db::get_alert(pool, alert_id).await? {
            self.bus.publish(&Event::AlertResolved(alert));
        }
        Ok(())
    }

    /// Resolve a batch of deduper-closed alerts, logging failures rather
    /// than interrupting the caller.
    pub async fn close_alerts(&self, closed: Vec<(DedupKey, i64)>) {
        for (key, alert_id) in closed {
            if alert_id == 0 {
                continue;
            }
            if let Err(err) = self.close_alert(alert_id).await {
                tracing::error!(
                    "Failed to auto-close alert {} for {}: {}",
                    alert_id,
                    key.ident,
                    err
                );
            }
        }
    }

    // ========== LOOP HEARTBEATS ==========

    pub fn mark_loop_heartbeat(&self, name: &'static str) {
        if let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) {
            self.loop_heartbeats.insert(name, now.as_secs());
        }
    }

    pub fn loop_last_tick_secs(&self, name: &str) -> Option<u64> {
        self.loop_heartbeats.get(name).map(|entry| *entry.value())
    }
}
