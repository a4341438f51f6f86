//! API error surface and status mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use skywatch_core::{GeometryError, TelemetryError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid telemetry: {0}")]
    InvalidTelemetry(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("insufficient role")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("store unavailable")]
    StoreUnavailable,
    #[error("ingest deadline exceeded")]
    DeadlineExceeded,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidTelemetry(_)
            | ApiError::MalformedGeometry(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::StoreUnavailable | ApiError::DeadlineExceeded => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<TelemetryError> for ApiError {
    fn from(err: TelemetryError) -> Self {
        ApiError::InvalidTelemetry(err.to_string())
    }
}

impl From<GeometryError> for ApiError {
    fn from(err: GeometryError) -> Self {
        ApiError::MalformedGeometry(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("store error: {}", err);
        ApiError::StoreUnavailable
    }
}
