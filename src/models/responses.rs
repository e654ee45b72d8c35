//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::connection::ConnectionQuality;
use crate::prefetch::PrefetchStats;

/// Response body for `GET /fetch`
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    /// The URL, also the cache key
    pub key: String,
    pub value: Value,
}

impl FetchResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Confirmation body for `PUT /set`, `DELETE /invalidate` and `DELETE /clear`
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl MessageResponse {
    pub fn set(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key: Some(key),
        }
    }

    pub fn invalidated(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' invalidated, fast layer cleared", key),
            key: Some(key),
        }
    }

    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
            key: None,
        }
    }
}

/// Response body for `POST /prefetch` and `POST /prefetch/hover`
#[derive(Debug, Clone, Serialize)]
pub struct PrefetchResponse {
    pub url: String,
    pub priority: u8,
    /// False when slow-link gating dropped the task
    pub queued: bool,
}

/// Response body for `POST /prefetch/history`
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub queued: usize,
    pub dropped: usize,
}

/// Response body for `GET /connection` and `PUT /connection`
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionResponse {
    pub effective_type: Option<String>,
    pub quality: ConnectionQuality,
}

/// Response body for the stats endpoint (`GET /stats`)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    /// Reads served without a fetch / all reads
    pub hit_rate: f64,
    /// Entries currently held by the fast layer
    pub fast_entries: usize,
    pub prefetch: PrefetchStats,
    /// Prefetch tasks waiting for a batch
    pub prefetch_queued: usize,
}

impl StatsResponse {
    pub fn new(
        cache: CacheStats,
        fast_entries: usize,
        prefetch: PrefetchStats,
        prefetch_queued: usize,
    ) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            fast_entries,
            prefetch,
            prefetch_queued,
        }
    }
}

/// Response body for the health endpoint (`GET /health`)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
