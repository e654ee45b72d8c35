//! Cache Entry Module
//!
//! Defines the structure shared by both cache layers: a value with an
//! absolute expiry and a retention priority.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::duration_ms;

// == Cache Entry ==
/// A single cached value with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Caller-chosen key, stored verbatim
    pub key: String,
    /// Opaque cached value
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Retention hint for the durable store, higher is kept longer
    pub priority: u8,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry expiring `ttl` after `now_ms`.
    pub fn new(key: impl Into<String>, value: Value, now_ms: u64, ttl: Duration, priority: u8) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: now_ms.saturating_add(duration_ms(ttl)),
            priority,
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now >= expires_at`, so a TTL of zero is
    /// never observable.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining lifetime in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_expiry_from_ttl() {
        let entry = CacheEntry::new("k", json!("v"), 1_000, Duration::from_millis(500), 1);

        assert_eq!(entry.expires_at, 1_500);
        assert!(!entry.is_expired(1_499));
        assert!(entry.is_expired(1_500));
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new("k", json!(1), 42, Duration::ZERO, 1);
        assert!(entry.is_expired(42));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new("k", json!(null), 0, Duration::from_secs(10), 1);

        assert_eq!(entry.ttl_remaining_ms(4_000), 6_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new("k", json!(null), u64::MAX - 1, Duration::MAX, 3);
        assert_eq!(entry.expires_at, u64::MAX);
    }

    #[test]
    fn test_entry_serde_shape() {
        let entry = CacheEntry::new("article:7", json!({"title": "Torts"}), 0, Duration::from_millis(10), 2);
        let text = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&text).unwrap();

        assert!(text.contains("\"expires_at\":10"));
        assert_eq!(back, entry);
    }
}
