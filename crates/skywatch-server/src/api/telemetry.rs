//! Telemetry intake endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use skywatch_core::models::{Alert, Flight, TelemetryReport};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::pipeline;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub track: Flight,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

/// Record a position report.
///
/// The response is returned only after the track is persisted and any
/// resulting alert has been handed to the bus. The whole pipeline runs
/// under the ingest wall-clock deadline.
pub async fn ingest_telemetry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TelemetryReport>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let Json(report) =
        payload.map_err(|rejection| ApiError::InvalidTelemetry(rejection.body_text()))?;

    let deadline = Duration::from_millis(state.config().ingest_deadline_ms);
    let outcome = tokio::time::timeout(deadline, pipeline::ingest(&state, report))
        .await
        .map_err(|_| ApiError::DeadlineExceeded)??;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            track: outcome.flight,
            alert: outcome.alert,
        }),
    ))
}
