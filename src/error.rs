//! Error types for the cache service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layers, the prefetch engine and the API.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Durable store rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem failure underneath the durable store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be converted to or from its cached form
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network transport failure while fetching a resource
    #[error("Request failed: {0}")]
    Request(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    /// Upstream body was not valid JSON
    #[error("Failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Request(_)
            | CacheError::UpstreamStatus { .. }
            | CacheError::Parse { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Storage(_)
            | CacheError::Io(_)
            | CacheError::Serialization(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache service.
pub type Result<T> = std::result::Result<T, CacheError>;
