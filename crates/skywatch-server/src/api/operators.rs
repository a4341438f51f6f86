//! Operator account endpoints: registration and login.
//!
//! The credential is treated as an opaque verifier; hashing policy belongs
//! to the account subsystem. Comparison is constant-time.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use skywatch_core::models::Role;
use std::sync::Arc;

use crate::api::auth;
use crate::error::ApiError;
use crate::persistence::operators as operators_db;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub credential: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub operator_id: i64,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub credential: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

/// Create an operator account.
///
/// Public when open registration is configured, otherwise admin-only.
/// Creating another admin always requires an admin bearer.
pub async fn register_operator(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let role = req.role.unwrap_or(Role::Analyst);

    if !state.config().open_registration || role == Role::Admin {
        let ctx = auth::authenticate(&state, &headers)?;
        auth::require_admin(&ctx)?;
    }

    let email = req.email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') || req.credential.is_empty() {
        return Err(ApiError::BadRequest(
            "email and credential are required".to_string(),
        ));
    }

    match operators_db::insert_operator(state.database().pool(), &email, role, &req.credential)
        .await?
    {
        operators_db::InsertOutcome::Created(operator) => {
            tracing::info!("Registered operator {} ({:?})", operator.email, role);
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    operator_id: operator.id,
                    email: operator.email,
                    role: operator.role,
                }),
            ))
        }
        operators_db::InsertOutcome::DuplicateEmail => Err(ApiError::Conflict(format!(
            "operator {} already exists",
            email
        ))),
    }
}

/// Exchange a credential for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_ascii_lowercase();
    let operator = operators_db::find_by_email(state.database().pool(), &email)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !auth::constant_time_eq(
        req.credential.as_bytes(),
        operator.credential_verifier.as_bytes(),
    ) {
        return Err(ApiError::Unauthenticated);
    }

    let token = auth::issue_token(
        &operator,
        &state.config().jwt_secret,
        state.config().jwt_ttl_hours,
    )
    .map_err(|err| {
        tracing::error!("Failed to issue token: {}", err);
        ApiError::StoreUnavailable
    })?;

    Ok(Json(LoginResponse {
        token,
        role: operator.role,
    }))
}
