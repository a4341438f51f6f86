//! The telemetry assessment pipeline.
//!
//! validate -> classify -> zone containment -> trajectory -> score ->
//! persist track -> dedup -> (conditional) persist alert -> publish.
//!
//! The flight insert is the atomic commit point; the caller wraps the whole
//! pipeline in the ingest deadline and nothing is persisted once it aborts
//! before that write.

use chrono::Utc;
use skywatch_core::models::{Alert, Event, Flight, TelemetryReport, ThreatLevel, UNKNOWN_TRANSPONDER};
use skywatch_core::{classifier, sensor, threat, trajectory};

use crate::dedup::{Claim, DedupKey};
use crate::error::ApiError;
use crate::persistence::{alerts as alerts_db, flights as flights_db};
use crate::state::AppState;

/// What one accepted telemetry report produced.
pub struct IngestOutcome {
    pub flight: Flight,
    pub alert: Option<Alert>,
}

/// Run the full pipeline for one report.
pub async fn ingest(state: &AppState, report: TelemetryReport) -> Result<IngestOutcome, ApiError> {
    report.validate()?;

    let ident = report.ident().map(str::to_string);
    let identified = ident.is_some();
    let classification = classifier::classify(report.altitude_ft, report.groundspeed_kt, identified);

    let zone = state.first_containing_zone(report.latitude, report.longitude);
    let zone_id = zone.as_ref().map(|z| z.id);
    let in_restricted_area = zone.is_some();

    let predicted_trajectory = trajectory::predict(
        report.latitude,
        report.longitude,
        report.groundspeed_kt,
        report.track_deg,
        state.config().trajectory_config(),
    );

    let assessment = threat::assess(
        threat::ThreatInputs {
            in_restricted_area,
            identified,
            classification,
            groundspeed_kt: report.groundspeed_kt,
            altitude_ft: report.altitude_ft,
        },
        state.config().threat_weights(),
    );

    let estimate = sensor::estimate(identified);

    let mut flight = Flight {
        id: 0,
        transponder_id: ident.clone(),
        latitude: report.latitude,
        longitude: report.longitude,
        altitude_ft: report.altitude_ft,
        groundspeed_kt: report.groundspeed_kt,
        track_deg: report.track_deg,
        timestamp: Utc::now(),
        classification,
        threat_level: assessment.level,
        threat_score: assessment.score,
        detection_confidence: estimate.detection_confidence,
        signal_strength: estimate.signal_strength,
        weather_condition: estimate.weather_condition.to_string(),
        in_restricted_area,
        predicted_trajectory,
    };

    flight.id = insert_flight_with_retry(state, &flight).await?;
    state.record_latest(flight.clone());
    state.bus.publish(&Event::TrackUpdate(flight.clone()));

    let alert = run_dedup(state, &flight, &assessment, zone_id).await?;

    if let Some(zone) = zone {
        tracing::debug!(
            "Track {} inside region '{}', score {}",
            flight.snapshot_key(),
            zone.name,
            flight.threat_score
        );
    }

    Ok(IngestOutcome { flight, alert })
}

/// Dedup step: track zone entry/exit and emit at most one alert per open
/// (identifier, region, severity) key.
async fn run_dedup(
    state: &AppState,
    flight: &Flight,
    assessment: &threat::ThreatAssessment,
    zone_id: Option<i64>,
) -> Result<Option<Alert>, ApiError> {
    let track_ident = flight.snapshot_key().to_string();

    if flight.in_restricted_area {
        state.deduper.note_intrusion(&track_ident);
    } else {
        let closed = state.deduper.note_clear(&track_ident);
        if !closed.is_empty() {
            tracing::info!(
                "Track {} clear of all regions; closing {} open alert(s)",
                track_ident,
                closed.len()
            );
            state.close_alerts(closed).await;
        }
    }

    if assessment.level < ThreatLevel::High {
        return Ok(None);
    }

    let key = DedupKey::new(
        flight.transponder_id.as_deref(),
        zone_id,
        assessment.level,
    );

    match state.deduper.claim(&key, flight.timestamp) {
        Claim::Refreshed { alert_id } => {
            // Continuing condition: refresh, do not re-emit.
            if let Err(err) =
                alerts_db::touch_alert(state.database().pool(), alert_id, flight.timestamp).await
            {
                tracing::warn!("Failed to refresh alert {}: {}", alert_id, err);
            }
            Ok(None)
        }
        Claim::New => {
            let mut alert = Alert {
                id: 0,
                flight_id: flight.id,
                transponder_id: key.ident.clone(),
                region_id: zone_id,
                severity: assessment.level,
                message: alert_message(flight, assessment),
                threat_reasons: assessment.reasons.clone(),
                recommended_action: assessment.recommended_action.clone(),
                resolved: false,
                created_at: flight.timestamp,
            };

            match insert_alert_with_retry(state, &alert).await {
                Ok(id) => {
                    alert.id = id;
                    state.deduper.confirm(&key, id);
                    state.bus.publish(&Event::Alert(alert.clone()));
                    tracing::warn!(
                        "{} alert {} for track {}: {}",
                        alert.severity.as_str(),
                        alert.id,
                        alert.transponder_id,
                        alert.message
                    );
                    Ok(Some(alert))
                }
                Err(err) => {
                    state.deduper.release(&key);
                    Err(err)
                }
            }
        }
    }
}

fn alert_message(flight: &Flight, assessment: &threat::ThreatAssessment) -> String {
    let label = flight
        .transponder_id
        .as_deref()
        .unwrap_or(UNKNOWN_TRANSPONDER);
    format!(
        "{} threat (score {}) for track {}",
        assessment.level.as_str(),
        assessment.score,
        label
    )
}

async fn insert_flight_with_retry(state: &AppState, flight: &Flight) -> Result<i64, ApiError> {
    let pool = state.database().pool();
    match flights_db::insert_flight(pool, flight).await {
        Ok(id) => Ok(id),
        Err(err) => {
            tracing::warn!("Flight insert failed, retrying once: {}", err);
            flights_db::insert_flight(pool, flight).await.map_err(|err| {
                tracing::error!("Flight insert retry failed: {}", err);
                ApiError::StoreUnavailable
            })
        }
    }
}

async fn insert_alert_with_retry(state: &AppState, alert: &Alert) -> Result<i64, ApiError> {
    let pool = state.database().pool();
    match alerts_db::insert_alert(pool, alert).await {
        Ok(id) => Ok(id),
        Err(err) => {
            tracing::warn!("Alert insert failed, retrying once: {}", err);
            alerts_db::insert_alert(pool, alert).await.map_err(|err| {
                tracing::error!("Alert insert retry failed: {}", err);
                ApiError::StoreUnavailable
            })
        }
    }
}
