//! Alert feed and acknowledgement endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use skywatch_core::models::{Alert, Event};
use std::sync::Arc;

use crate::error::ApiError;
use crate::persistence::alerts as alerts_db;
use crate::state::AppState;

const DEFAULT_ALERT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub limit: Option<i64>,
    pub resolved: Option<bool>,
}

/// Recent alerts for the dashboard feed.
pub async fn list_recent_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT).clamp(1, 1000);
    let alerts =
        alerts_db::list_recent_alerts(state.database().pool(), limit, query.resolved).await?;
    Ok(Json(alerts))
}

/// Operator acknowledgement: mark an alert resolved.
///
/// Idempotent; resolving twice is a no-op with the same response.
pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, ApiError> {
    let pool = state.database().pool();
    if !alerts_db::resolve_alert(pool, id).await? {
        return Err(ApiError::NotFound("alert"));
    }

    state.deduper.forget_alert(id);

    let alert = alerts_db::get_alert(pool, id)
        .await?
        .ok_or(ApiError::NotFound("alert"))?;
    state.bus.publish(&Event::AlertResolved(alert.clone()));

    tracing::info!("Alert {} resolved by operator", id);
    Ok(Json(alert))
}
