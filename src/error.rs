use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("invalid backend url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
    #[error("a test call is already being submitted")]
    CallInProgress,
}

pub type DashboardResult<T> = Result<T, DashboardError>;

/// A single feedback row whose serialized `action_items` could not be read.
/// Only that row is dropped from the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("malformed feedback record {feedback_id}: {reason}")]
pub struct MalformedRecord {
    pub feedback_id: i64,
    pub reason: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::CallInProgress => StatusCode::CONFLICT,
            DashboardError::InvalidBaseUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DashboardError::Transport { .. }
            | DashboardError::Status { .. }
            | DashboardError::Decode { .. } => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
