//! Alert persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use skywatch_core::models::{Alert, ThreatLevel};
use sqlx::SqlitePool;

use super::flights::{parse_threat_level, parse_timestamp};

/// Insert a new alert; returns the assigned row id.
pub async fn insert_alert(pool: &SqlitePool, alert: &Alert) -> Result<i64> {
    let reasons_json = serde_json::to_string(&alert.threat_reasons)?;

    let result = sqlx::query(
        r#"
        INSERT INTO alerts (
            flight_id, transponder_id, region_id, severity, message,
            threat_reasons, recommended_action, resolved, created_at, last_seen
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
    )
    .bind(alert.flight_id)
    .bind(&alert.transponder_id)
    .bind(alert.region_id)
    .bind(alert.severity.as_str())
    .bind(&alert.message)
    .bind(&reasons_json)
    .bind(&alert.recommended_action)
    .bind(alert.resolved)
    .bind(alert.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Recent alerts, newest first. `resolved` filters when set.
pub async fn list_recent_alerts(
    pool: &SqlitePool,
    limit: i64,
    resolved: Option<bool>,
) -> Result<Vec<Alert>> {
    let rows = match resolved {
        Some(flag) => {
            sqlx::query_as::<_, AlertRow>(
                "SELECT * FROM alerts WHERE resolved = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )
            .bind(flag)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, AlertRow>(
                "SELECT * FROM alerts ORDER BY created_at DESC, id DESC LIMIT ?1",
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Fetch a single alert by id.
pub async fn get_alert(pool: &SqlitePool, id: i64) -> Result<Option<Alert>> {
    let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| r.try_into()).transpose()
}

/// Mark an alert resolved. Idempotent; returns false for an unknown id.
pub async fn resolve_alert(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE alerts SET resolved = 1 WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Refresh the last-seen timestamp of an open alert.
pub async fn touch_alert(pool: &SqlitePool, id: i64, seen_at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE alerts SET last_seen = ?2 WHERE id = ?1")
        .bind(id)
        .bind(seen_at.to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

/// Unresolved alerts with dedup key fields, for seeding the open-alert
/// map on cold start.
pub struct OpenAlertRow {
    pub id: i64,
    pub transponder_id: String,
    pub region_id: Option<i64>,
    pub severity: ThreatLevel,
    pub last_seen: DateTime<Utc>,
}

pub async fn load_open_alerts(pool: &SqlitePool) -> Result<Vec<OpenAlertRow>> {
    let rows = sqlx::query_as::<_, OpenRow>(
        "SELECT id, transponder_id, region_id, severity, last_seen FROM alerts WHERE resolved = 0",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| OpenAlertRow {
            id: r.id,
            transponder_id: r.transponder_id,
            region_id: r.region_id,
            severity: parse_threat_level(&r.severity),
            last_seen: parse_timestamp(&r.last_seen),
        })
        .collect())
}

/// Delete one batch of resolved alerts older than the cutoff.
/// Unresolved alerts are never deleted.
pub async fn delete_resolved_alerts_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
    batch: i64,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM alerts WHERE id IN (
            SELECT id FROM alerts WHERE resolved = 1 AND created_at < ?1 LIMIT ?2
        )
        "#,
    )
    .bind(cutoff.to_rfc3339())
    .bind(batch)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// Internal row types for SQLx
#[derive(sqlx::FromRow)]
struct AlertRow {
    id: i64,
    flight_id: i64,
    transponder_id: String,
    region_id: Option<i64>,
    severity: String,
    message: String,
    threat_reasons: String,
    recommended_action: String,
    resolved: bool,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct OpenRow {
    id: i64,
    transponder_id: String,
    region_id: Option<i64>,
    severity: String,
    last_seen: String,
}

impl TryFrom<AlertRow> for Alert {
    type Error = anyhow::Error;

    fn try_from(row: AlertRow) -> Result<Self> {
        let threat_reasons: Vec<String> = serde_json::from_str(&row.threat_reasons)?;

        Ok(Alert {
            id: row.id,
            flight_id: row.flight_id,
            transponder_id: row.transponder_id,
            region_id: row.region_id,
            severity: parse_threat_level(&row.severity),
            message: row.message,
            threat_reasons,
            recommended_action: row.recommended_action,
            resolved: row.resolved,
            created_at: parse_timestamp(&row.created_at),
        })
    }
}
