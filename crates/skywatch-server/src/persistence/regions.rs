//! Restricted region persistence operations.

use anyhow::Result;
use chrono::Utc;
use skywatch_core::models::RestrictedRegion;
use sqlx::SqlitePool;

use super::flights::parse_timestamp;

/// Insert a new region; returns the stored record.
pub async fn insert_region(
    pool: &SqlitePool,
    name: &str,
    polygon_json: &str,
) -> Result<RestrictedRegion> {
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO restricted_regions (name, polygon_json, active, created_at) VALUES (?1, ?2, 1, ?3)",
    )
    .bind(name)
    .bind(polygon_json)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(RestrictedRegion {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        polygon_json: polygon_json.to_string(),
        active: true,
        created_at,
    })
}

/// All regions, newest first.
pub async fn list_regions(pool: &SqlitePool) -> Result<Vec<RestrictedRegion>> {
    let rows = sqlx::query_as::<_, RegionRow>(
        "SELECT * FROM restricted_regions ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RestrictedRegion::from).collect())
}

/// Only regions participating in containment checks.
pub async fn list_active_regions(pool: &SqlitePool) -> Result<Vec<RestrictedRegion>> {
    let rows = sqlx::query_as::<_, RegionRow>(
        "SELECT * FROM restricted_regions WHERE active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RestrictedRegion::from).collect())
}

/// Flip the active flag. Returns the updated region, or None for an
/// unknown id.
pub async fn toggle_region(pool: &SqlitePool, id: i64) -> Result<Option<RestrictedRegion>> {
    let result = sqlx::query("UPDATE restricted_regions SET active = NOT active WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query_as::<_, RegionRow>("SELECT * FROM restricted_regions WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(RestrictedRegion::from))
}

/// Delete a region by id.
pub async fn delete_region(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM restricted_regions WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct RegionRow {
    id: i64,
    name: String,
    polygon_json: String,
    active: bool,
    created_at: String,
}

impl From<RegionRow> for RestrictedRegion {
    fn from(row: RegionRow) -> Self {
        RestrictedRegion {
            id: row.id,
            name: row.name,
            polygon_json: row.polygon_json,
            active: row.active,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}
