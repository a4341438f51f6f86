//! Restricted region endpoints.
//!
//! CRUD is admin-only; reads are open to any authenticated operator.
//! Every mutation rebuilds the active-region cache so the next telemetry
//! sample sees the change.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use skywatch_core::models::RestrictedRegion;
use skywatch_core::ZoneGeometry;
use std::sync::Arc;

use crate::api::auth::{require_admin, AuthContext};
use crate::error::ApiError;
use crate::persistence::regions as regions_db;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRegionRequest {
    pub name: String,
    /// Serialized GeoJSON "Polygon" object.
    pub polygon_json: String,
}

/// Create a new restricted region.
pub async fn create_region(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateRegionRequest>,
) -> Result<(StatusCode, Json<RestrictedRegion>), ApiError> {
    require_admin(&ctx)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("region name is required".to_string()));
    }

    // The cache reload assumes stored polygon text parses.
    ZoneGeometry::parse(&req.polygon_json)?;

    let region = regions_db::insert_region(state.database().pool(), name, &req.polygon_json).await?;
    state.reload_zones().await?;

    tracing::info!("Created restricted region '{}' ({})", region.name, region.id);
    Ok((StatusCode::CREATED, Json(region)))
}

/// List all regions, active or not.
pub async fn list_regions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RestrictedRegion>>, ApiError> {
    Ok(Json(regions_db::list_regions(state.database().pool()).await?))
}

/// List only the regions participating in containment checks.
pub async fn list_active_regions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RestrictedRegion>>, ApiError> {
    Ok(Json(
        regions_db::list_active_regions(state.database().pool()).await?,
    ))
}

/// Flip a region's active flag.
pub async fn toggle_region(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<RestrictedRegion>, ApiError> {
    require_admin(&ctx)?;

    let region = regions_db::toggle_region(state.database().pool(), id)
        .await?
        .ok_or(ApiError::NotFound("region"))?;
    state.reload_zones().await?;

    tracing::info!(
        "Region '{}' ({}) now {}",
        region.name,
        region.id,
        if region.active { "active" } else { "inactive" }
    );
    Ok(Json(region))
}

/// Delete a region.
pub async fn delete_region(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&ctx)?;

    if !regions_db::delete_region(state.database().pool(), id).await? {
        return Err(ApiError::NotFound("region"));
    }
    state.reload_zones().await?;

    tracing::info!("Deleted restricted region {}", id);
    Ok(StatusCode::OK)
}
