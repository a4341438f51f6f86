//! Bearer-token authentication for protected endpoints.
//!
//! Tokens are HS256 JWTs carrying the operator id, email, and role. The
//! middleware validates signature and expiry and attaches an `AuthContext`
//! for handlers; role enforcement happens per-route.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use skywatch_core::models::{Operator, Role};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims issued at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Operator id
    pub sub: i64,
    pub email: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

/// Authenticated caller identity, attached as a request extension.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub operator_id: i64,
    pub email: String,
    pub role: Role,
}

/// Length-gated XOR fold; comparison time does not depend on where the
/// inputs first differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .fold(0u8, |diff, (left, right)| diff | (left ^ right))
            == 0
}

/// Issue a bearer token for an authenticated operator.
pub fn issue_token(operator: &Operator, secret: &str, ttl_hours: i64) -> anyhow::Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| anyhow::anyhow!("system clock before epoch"))?
        .as_secs();

    let claims = Claims {
        sub: operator.id,
        email: operator.email.clone(),
        role: operator.role,
        exp: now + (ttl_hours.max(1) as u64) * 3600,
        iat: now,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Validate a bearer token; signature and expiry failures are both 401.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthenticated)
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the caller from request headers.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;
    let claims = decode_claims(&token, &state.config().jwt_secret)?;
    Ok(AuthContext {
        operator_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Middleware requiring a valid bearer token on every request.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()) {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Role gate for admin-only operations.
pub fn require_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
