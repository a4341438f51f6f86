//! Track query endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use skywatch_core::models::Flight;
use std::sync::Arc;

use crate::error::ApiError;
use crate::persistence::flights as flights_db;
use crate::state::AppState;

const DEFAULT_SNAPSHOT_LIMIT: usize = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackView {
    /// Latest record per external identifier.
    #[default]
    Snapshot,
    /// Raw insertion history, newest first.
    History,
}

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub view: TrackView,
}

/// Recent tracks: the latest-per-identifier snapshot by default, or the
/// raw insertion history with `view=history`.
pub async fn list_recent_tracks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<Vec<Flight>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_SNAPSHOT_LIMIT).max(1);
    let flights = match query.view {
        TrackView::Snapshot => state.latest_snapshot(limit),
        TrackView::History => {
            flights_db::list_recent_flights(state.database().pool(), limit as i64).await?
        }
    };
    Ok(Json(flights))
}
