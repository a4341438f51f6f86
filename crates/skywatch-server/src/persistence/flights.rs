//! Flight (track record) persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use skywatch_core::models::{Classification, Flight, ThreatLevel, TrajectoryPoint};
use sqlx::SqlitePool;

/// Insert a track record; returns the assigned row id.
pub async fn insert_flight(pool: &SqlitePool, flight: &Flight) -> Result<i64> {
    let trajectory_json = serde_json::to_string(&flight.predicted_trajectory)?;

    let result = sqlx::query(
        r#"
        INSERT INTO flights (
            transponder_id, latitude, longitude, altitude_ft, groundspeed_kt, track_deg,
            timestamp, classification, threat_level, threat_score,
            detection_confidence, signal_strength, weather_condition,
            in_restricted_area, predicted_trajectory
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&flight.transponder_id)
    .bind(flight.latitude)
    .bind(flight.longitude)
    .bind(flight.altitude_ft)
    .bind(flight.groundspeed_kt)
    .bind(flight.track_deg)
    .bind(flight.timestamp.to_rfc3339())
    .bind(format!("{:?}", flight.classification))
    .bind(flight.threat_level.as_str())
    .bind(i64::from(flight.threat_score))
    .bind(i64::from(flight.detection_confidence))
    .bind(i64::from(flight.signal_strength))
    .bind(&flight.weather_condition)
    .bind(flight.in_restricted_area)
    .bind(&trajectory_json)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent track records, newest first.
pub async fn list_recent_flights(pool: &SqlitePool, limit: i64) -> Result<Vec<Flight>> {
    let rows = sqlx::query_as::<_, FlightRow>(
        "SELECT * FROM flights ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Latest record per external identifier, for rebuilding the snapshot
/// cache at startup. Unidentified tracks share one slot.
pub async fn latest_per_transponder(pool: &SqlitePool) -> Result<Vec<Flight>> {
    let rows = sqlx::query_as::<_, FlightRow>(
        r#"
        SELECT * FROM flights
        WHERE id IN (
            SELECT MAX(id) FROM flights GROUP BY COALESCE(transponder_id, 'UNKNOWN')
        )
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Delete one batch of track records older than the cutoff.
/// Returns the number removed; callers loop until it reaches zero.
pub async fn delete_flights_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
    batch: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM flights WHERE id IN (SELECT id FROM flights WHERE timestamp < ?1 LIMIT ?2)",
    )
    .bind(cutoff.to_rfc3339())
    .bind(batch)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct FlightRow {
    id: i64,
    transponder_id: Option<String>,
    latitude: f64,
    longitude: f64,
    altitude_ft: f64,
    groundspeed_kt: f64,
    track_deg: f64,
    timestamp: String,
    classification: String,
    threat_level: String,
    threat_score: i64,
    detection_confidence: i64,
    signal_strength: i64,
    weather_condition: String,
    in_restricted_area: bool,
    predicted_trajectory: String,
}

pub(crate) fn parse_threat_level(raw: &str) -> ThreatLevel {
    match raw {
        "Medium" => ThreatLevel::Medium,
        "High" => ThreatLevel::High,
        "Critical" => ThreatLevel::Critical,
        _ => ThreatLevel::Low,
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl TryFrom<FlightRow> for Flight {
    type Error = anyhow::Error;

    fn try_from(row: FlightRow) -> Result<Self> {
        let classification = match row.classification.as_str() {
            "SmallProp" => Classification::SmallProp,
            "Airliner" => Classification::Airliner,
            "HighPerformance" => Classification::HighPerformance,
            "Fighter" => Classification::Fighter,
            "Helicopter" => Classification::Helicopter,
            _ => Classification::Unknown,
        };

        let predicted_trajectory: Vec<TrajectoryPoint> =
            serde_json::from_str(&row.predicted_trajectory)?;

        Ok(Flight {
            id: row.id,
            transponder_id: row.transponder_id,
            latitude: row.latitude,
            longitude: row.longitude,
            altitude_ft: row.altitude_ft,
            groundspeed_kt: row.groundspeed_kt,
            track_deg: row.track_deg,
            timestamp: parse_timestamp(&row.timestamp),
            classification,
            threat_level: parse_threat_level(&row.threat_level),
            threat_score: row.threat_score.clamp(0, 100) as u8,
            detection_confidence: row.detection_confidence.clamp(0, 100) as u8,
            signal_strength: row.signal_strength.clamp(0, 100) as u8,
            weather_condition: row.weather_condition,
            in_restricted_area: row.in_restricted_area,
            predicted_trajectory,
        })
    }
}
