//! Core data models for the airspace monitoring system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transponder value that marks a report as unidentified.
pub const UNKNOWN_TRANSPONDER: &str = "UNKNOWN";

/// A single position report received from a telemetry source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReport {
    #[serde(default)]
    pub transponder_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in feet.
    #[serde(rename = "altitude")]
    pub altitude_ft: f64,
    /// Ground speed in knots.
    #[serde(rename = "groundspeed")]
    pub groundspeed_kt: f64,
    /// Heading/track in degrees [0, 360).
    #[serde(rename = "track")]
    pub track_deg: f64,
}

/// Validation failure for an inbound telemetry report.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl TelemetryReport {
    /// Validate numeric fields against the wire contract.
    ///
    /// NaN and infinite values are rejected here so downstream stages
    /// only ever see well-formed kinematics.
    pub fn validate(&self) -> Result<(), TelemetryError> {
        let fields = [
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("altitude", self.altitude_ft),
            ("groundspeed", self.groundspeed_kt),
            ("track", self.track_deg),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(TelemetryError::NotFinite { field });
            }
        }

        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TelemetryError::OutOfRange {
                field: "latitude",
                value: self.latitude,
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TelemetryError::OutOfRange {
                field: "longitude",
                value: self.longitude,
            });
        }
        if self.altitude_ft < 0.0 {
            return Err(TelemetryError::OutOfRange {
                field: "altitude",
                value: self.altitude_ft,
            });
        }
        if self.groundspeed_kt < 0.0 {
            return Err(TelemetryError::OutOfRange {
                field: "groundspeed",
                value: self.groundspeed_kt,
            });
        }
        if !(0.0..360.0).contains(&self.track_deg) {
            return Err(TelemetryError::OutOfRange {
                field: "track",
                value: self.track_deg,
            });
        }
        Ok(())
    }

    /// The cooperative identifier, if the report carries one.
    ///
    /// A missing transponder ID or the literal "UNKNOWN" both mark the
    /// track as unidentified.
    pub fn ident(&self) -> Option<&str> {
        match self.transponder_id.as_deref() {
            Some(id) if !id.trim().is_empty() && id != UNKNOWN_TRANSPONDER => Some(id),
            _ => None,
        }
    }
}

/// Coarse aircraft category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    SmallProp,
    Airliner,
    HighPerformance,
    Fighter,
    Helicopter,
    Unknown,
}

/// Threat severity bucket derived from the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Map a clamped score onto its severity bucket.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => ThreatLevel::Low,
            25..=49 => ThreatLevel::Medium,
            50..=69 => ThreatLevel::High,
            _ => ThreatLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "Low",
            ThreatLevel::Medium => "Medium",
            ThreatLevel::High => "High",
            ThreatLevel::Critical => "Critical",
        }
    }
}

/// One forecast sample along a predicted path.
///
/// Serialized on the wire as a `[lat, lon, offset_seconds]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "(f64, f64, f64)", from = "(f64, f64, f64)")]
pub struct TrajectoryPoint {
    pub lat: f64,
    pub lon: f64,
    pub offset_s: f64,
}

impl From<TrajectoryPoint> for (f64, f64, f64) {
    fn from(p: TrajectoryPoint) -> Self {
        (p.lat, p.lon, p.offset_s)
    }
}

impl From<(f64, f64, f64)> for TrajectoryPoint {
    fn from((lat, lon, offset_s): (f64, f64, f64)) -> Self {
        Self { lat, lon, offset_s }
    }
}

/// A persisted track record: one telemetry observation with derived
/// fields attached. Created by the ingest pipeline, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: i64,
    pub transponder_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "altitude")]
    pub altitude_ft: f64,
    #[serde(rename = "groundspeed")]
    pub groundspeed_kt: f64,
    #[serde(rename = "track")]
    pub track_deg: f64,
    pub timestamp: DateTime<Utc>,
    pub classification: Classification,
    pub threat_level: ThreatLevel,
    pub threat_score: u8,
    pub detection_confidence: u8,
    pub signal_strength: u8,
    pub weather_condition: String,
    pub in_restricted_area: bool,
    pub predicted_trajectory: Vec<TrajectoryPoint>,
}

impl Flight {
    /// Key used for the latest-per-identifier snapshot. Unidentified
    /// tracks collapse onto the shared "UNKNOWN" slot.
    pub fn snapshot_key(&self) -> &str {
        self.transponder_id.as_deref().unwrap_or(UNKNOWN_TRANSPONDER)
    }
}

/// An operator-defined restricted polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictedRegion {
    pub id: i64,
    pub name: String,
    /// Serialized GeoJSON "Polygon" object, the wire form of the geometry.
    pub polygon_json: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted record that an elevated threat was observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub flight_id: i64,
    /// Denormalized identifier; "UNKNOWN-<region>" for unidentified tracks.
    pub transponder_id: String,
    /// Region the track intruded into, if the alert came from an intrusion.
    pub region_id: Option<i64>,
    pub severity: ThreatLevel,
    pub message: String,
    pub threat_reasons: Vec<String>,
    pub recommended_action: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Operator roles for the access-control predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Analyst,
}

/// An operator account. The credential verifier is opaque to the core
/// and only ever compared, never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: i64,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub credential_verifier: String,
    pub created_at: DateTime<Utc>,
}

/// Envelope pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    Alert(Alert),
    AlertResolved(Alert),
    TrackUpdate(Flight),
}
