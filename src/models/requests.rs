//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Longest accepted cache key or URL, in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!("Key exceeds maximum length of {} bytes", MAX_KEY_LENGTH));
    }
    None
}

fn validate_url(url: &str) -> Option<String> {
    if let Some(error) = validate_key(url) {
        return Some(error);
    }
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => None,
        Ok(parsed) => Some(format!("Unsupported URL scheme '{}'", parsed.scheme())),
        Err(e) => Some(format!("Invalid URL '{}': {}", url, e)),
    }
}

/// Query for `GET /fetch?url=`
#[derive(Debug, Clone, Deserialize)]
pub struct FetchQuery {
    pub url: String,
}

impl FetchQuery {
    pub fn validate(&self) -> Option<String> {
        validate_url(&self.url)
    }
}

/// Query for `DELETE /invalidate?key=`
#[derive(Debug, Clone, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

impl KeyQuery {
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Request body for `PUT /set`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Optional durable retention priority
    #[serde(default)]
    pub priority: Option<u8>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = validate_key(&self.key) {
            return Some(error);
        }
        if self.ttl_ms == Some(0) {
            return Some("TTL must be greater than zero".to_string());
        }
        if self.priority == Some(0) {
            return Some("Priority must be at least 1".to_string());
        }
        None
    }
}

/// Request body for `POST /prefetch`
#[derive(Debug, Clone, Deserialize)]
pub struct PrefetchRequest {
    pub url: String,
    #[serde(default)]
    pub priority: Option<u8>,
}

impl PrefetchRequest {
    pub fn validate(&self) -> Option<String> {
        validate_url(&self.url)
    }
}

/// Request body for `POST /prefetch/hover`
#[derive(Debug, Clone, Deserialize)]
pub struct HoverRequest {
    pub url: String,
}

impl HoverRequest {
    pub fn validate(&self) -> Option<String> {
        validate_url(&self.url)
    }
}

/// Request body for `POST /prefetch/history`
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRequest {
    pub urls: Vec<String>,
}

impl HistoryRequest {
    pub fn validate(&self) -> Option<String> {
        self.urls.iter().find_map(|url| validate_url(url))
    }
}

/// Request body for `PUT /connection`
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionUpdate {
    #[serde(default)]
    pub effective_type: Option<String>,
}
