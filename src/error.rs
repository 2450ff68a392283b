//! Error types for the storefront cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error Enum ==
/// Failures of the durable tier's backing storage.
///
/// These never reach callers of the cache; the cache logs them and degrades.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing would exceed the storage quota
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Storage is disabled or cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Value could not be encoded or a stored record could not be decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure in file-backed storage
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// == Api Error Enum ==
/// Failures raised by the storefront backend's fetch operations.
///
/// The cache layer passes these through untouched. `Clone` lets one in-flight
/// fetch hand the same result to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Request could not be sent or no response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not valid JSON
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Request arguments cannot be sent to the backend as given
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Fetch task failed outside the backend call
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Network(_) | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for backend calls.
pub type Result<T> = std::result::Result<T, ApiError>;
