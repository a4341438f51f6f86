//! Alert deduplication state.
//!
//! One unresolved alert per (identifier, region, severity) key at a time.
//! A continuing intrusion refreshes the open alert instead of emitting a
//! new one; leaving every region for two consecutive samples, or going
//! idle, closes it.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use skywatch_core::models::{ThreatLevel, UNKNOWN_TRANSPONDER};

/// Out-of-zone samples required before open alerts close.
const EXIT_SAMPLES_TO_CLOSE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub ident: String,
    pub region_id: i64,
    pub severity: ThreatLevel,
}

impl DedupKey {
    /// Build the key for a High/Critical sample. Unidentified tracks are
    /// scoped to the region so separate zones do not collide on "UNKNOWN".
    pub fn new(ident: Option<&str>, region_id: Option<i64>, severity: ThreatLevel) -> Self {
        let region_id = region_id.unwrap_or(0);
        let ident = match ident {
            Some(id) => id.to_string(),
            None => format!("{}-{}", UNKNOWN_TRANSPONDER, region_id),
        };
        Self {
            ident,
            region_id,
            severity,
        }
    }

    /// Whether this key belongs to the given track identifier.
    fn matches_track(&self, track_ident: &str) -> bool {
        if track_ident == UNKNOWN_TRANSPONDER {
            self.ident.starts_with(UNKNOWN_TRANSPONDER)
        } else {
            self.ident == track_ident
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenAlert {
    alert_id: i64,
    last_seen: DateTime<Utc>,
}

/// What the pipeline should do with a High/Critical sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// No open alert for this key; the caller owns inserting one and must
    /// confirm or release the claim.
    New,
    /// Open alert exists; last-seen has been refreshed.
    Refreshed { alert_id: i64 },
}

pub struct AlertDeduper {
    open: DashMap<DedupKey, OpenAlert>,
    exit_streaks: DashMap<String, u32>,
}

impl AlertDeduper {
    pub fn new() -> Self {
        Self {
            open: DashMap::new(),
            exit_streaks: DashMap::new(),
        }
    }

    /// Seed from unresolved store rows on cold start.
    pub fn seed(&self, key: DedupKey, alert_id: i64, last_seen: DateTime<Utc>) {
        self.open.insert(
            key,
            OpenAlert {
                alert_id,
                last_seen,
            },
        );
    }

    /// Claim the key for a new alert, or refresh the existing one.
    ///
    /// The map entry is reserved synchronously so two concurrent samples
    /// for the same key cannot both insert; the provisional entry carries
    /// alert id 0 until `confirm` stores the real row id.
    pub fn claim(&self, key: &DedupKey, seen_at: DateTime<Utc>) -> Claim {
        match self.open.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                entry.get_mut().last_seen = seen_at;
                Claim::Refreshed {
                    alert_id: entry.get().alert_id,
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(OpenAlert {
                    alert_id: 0,
                    last_seen: seen_at,
                });
                Claim::New
            }
        }
    }

    /// Attach the persisted row id to a claimed key.
    pub fn confirm(&self, key: &DedupKey, alert_id: i64) {
        if let Some(mut entry) = self.open.get_mut(key) {
            entry.alert_id = alert_id;
        }
    }

    /// Drop a claim whose store insert failed.
    pub fn release(&self, key: &DedupKey) {
        self.open.remove(key);
    }

    /// Record an in-zone sample: the exit streak resets.
    pub fn note_intrusion(&self, track_ident: &str) {
        self.exit_streaks.insert(track_ident.to_string(), 0);
    }

    /// Record an out-of-zone sample. Once the streak reaches the closing
    /// threshold, returns the open alerts for the track and removes them.
    pub fn note_clear(&self, track_ident: &str) -> Vec<(DedupKey, i64)> {
        let streak = {
            let mut entry = self
                .exit_streaks
                .entry(track_ident.to_string())
                .or_insert(0);
            *entry += 1;
            *entry
        };

        if streak < EXIT_SAMPLES_TO_CLOSE {
            return Vec::new();
        }
        self.exit_streaks.remove(track_ident);
        self.take_open_for_track(track_ident)
    }

    /// Open alerts whose last sample is older than the idle window.
    /// Removes and returns them for resolution.
    pub fn take_idle(&self, idle_window: Duration, now: DateTime<Utc>) -> Vec<(DedupKey, i64)> {
        let cutoff = now - idle_window;
        let idle: Vec<DedupKey> = self
            .open
            .iter()
            .filter(|entry| entry.value().last_seen < cutoff && entry.value().alert_id != 0)
            .map(|entry| entry.key().clone())
            .collect();

        idle.into_iter()
            .filter_map(|key| {
                self.open
                    .remove(&key)
                    .map(|(key, open)| (key, open.alert_id))
            })
            .collect()
    }

    /// Remove a key when its alert is resolved by an operator.
    pub fn forget_alert(&self, alert_id: i64) {
        let keys: Vec<DedupKey> = self
            .open
            .iter()
            .filter(|entry| entry.value().alert_id == alert_id)
            .map(|entry| entry.key().clone())
            .collect();
        for key in keys {
            self.open.remove(&key);
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    fn take_open_for_track(&self, track_ident: &str) -> Vec<(DedupKey, i64)> {
        let keys: Vec<DedupKey> = self
            .open
            .iter()
            .filter(|entry| entry.key().matches_track(track_ident))
            .map(|entry| entry.key().clone())
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                self.open
                    .remove(&key)
                    .map(|(key, open)| (key, open.alert_id))
            })
            .collect()
    }
}

impl Default for AlertDeduper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ident: Option<&str>, region: Option<i64>) -> DedupKey {
        DedupKey::new(ident, region, ThreatLevel::High)
    }

    #[test]
    fn unknown_tracks_are_scoped_per_region() {
        let a = key(None, Some(1));
        let b = key(None, Some(2));
        assert_ne!(a, b);
        assert_eq!(a.ident, "UNKNOWN-1");
    }

    #[test]
    fn first_claim_is_new_then_refreshes() {
        let deduper = AlertDeduper::new();
        let k = key(Some("VT-SAL"), Some(1));
        let now = Utc::now();

        assert_eq!(deduper.claim(&k, now), Claim::New);
        deduper.confirm(&k, 42);
        assert_eq!(
            deduper.claim(&k, now),
            Claim::Refreshed { alert_id: 42 }
        );
        assert_eq!(deduper.open_count(), 1);
    }

    #[test]
    fn released_claim_can_be_retaken() {
        let deduper = AlertDeduper::new();
        let k = key(Some("VT-SAL"), Some(1));
        let now = Utc::now();

        assert_eq!(deduper.claim(&k, now), Claim::New);
        deduper.release(&k);
        assert_eq!(deduper.claim(&k, now), Claim::New);
    }

    #[test]
    fn two_clear_samples_close_open_alerts() {
        let deduper = AlertDeduper::new();
        let k = key(Some("VT-SAL"), Some(1));
        deduper.claim(&k, Utc::now());
        deduper.confirm(&k, 7);
        deduper.note_intrusion("VT-SAL");

        assert!(deduper.note_clear("VT-SAL").is_empty());
        let closed = deduper.note_clear("VT-SAL");
        assert_eq!(closed, vec![(k, 7)]);
        assert_eq!(deduper.open_count(), 0);
    }

    #[test]
    fn intrusion_resets_exit_streak() {
        let deduper = AlertDeduper::new();
        let k = key(Some("VT-SAL"), Some(1));
        deduper.claim(&k, Utc::now());
        deduper.confirm(&k, 7);

        assert!(deduper.note_clear("VT-SAL").is_empty());
        deduper.note_intrusion("VT-SAL");
        assert!(deduper.note_clear("VT-SAL").is_empty());
        assert_eq!(deduper.note_clear("VT-SAL").len(), 1);
    }

    #[test]
    fn unknown_track_exit_closes_all_unknown_alerts() {
        let deduper = AlertDeduper::new();
        let a = key(None, Some(1));
        let b = key(None, Some(2));
        deduper.claim(&a, Utc::now());
        deduper.confirm(&a, 1);
        deduper.claim(&b, Utc::now());
        deduper.confirm(&b, 2);

        deduper.note_clear("UNKNOWN");
        let closed = deduper.note_clear("UNKNOWN");
        assert_eq!(closed.len(), 2);
    }

    #[test]
    fn idle_alerts_are_taken() {
        let deduper = AlertDeduper::new();
        let stale = key(Some("VT-SAL"), Some(1));
        let fresh = key(Some("AI301"), Some(1));
        let now = Utc::now();

        deduper.claim(&stale, now - Duration::seconds(300));
        deduper.confirm(&stale, 1);
        deduper.claim(&fresh, now);
        deduper.confirm(&fresh, 2);

        let idle = deduper.take_idle(Duration::seconds(120), now);
        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].1, 1);
        assert_eq!(deduper.open_count(), 1);
    }

    #[test]
    fn unconfirmed_claims_are_not_idle_closed() {
        let deduper = AlertDeduper::new();
        let k = key(Some("VT-SAL"), Some(1));
        let now = Utc::now();
        deduper.claim(&k, now - Duration::seconds(300));

        // Insert still in flight (alert id 0): the sweep must leave it.
        assert!(deduper.take_idle(Duration::seconds(120), now).is_empty());
    }
}
