//! API routes for the skywatch server.

pub mod alerts;
pub mod auth;
pub mod flights;
pub mod operators;
pub mod telemetry;
pub mod ws;
pub mod zones;


use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::state::AppState;

/// Create the API router.
pub fn routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/v1/telemetry", post(telemetry::ingest_telemetry))
        .route("/v1/flights", get(flights::list_recent_tracks))
        .route("/v1/zones", post(zones::create_region))
        .route("/v1/zones", get(zones::list_regions))
        .route("/v1/zones/active", get(zones::list_active_regions))
        .route("/v1/zones/:id/toggle", post(zones::toggle_region))
        .route("/v1/zones/:id", delete(zones::delete_region))
        .route("/v1/alerts", get(alerts::list_recent_alerts))
        .route("/v1/alerts/:id/resolve", post(alerts::resolve_alert))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/v1/operators/register", post(operators::register_operator))
        .route("/v1/auth/login", post(operators::login))
        .route("/v1/ws", get(ws::ws_handler))
        .merge(protected)
        .with_state(state)
}
