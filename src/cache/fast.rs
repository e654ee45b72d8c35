//! Fast Cache Layer
//!
//! Process-local map with lazy TTL expiry. Not capacity bounded; every
//! operation is synchronous.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cache::{CacheEntry, DEFAULT_PRIORITY};
use crate::clock::{Clock, SystemClock};

// == Fast Cache ==
/// In-memory TTL map.
pub struct FastCache {
    entries: HashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl FastCache {
    // == Constructor ==
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    // == Get ==
    /// Returns the value if present and unexpired. An expired entry is
    /// removed as soon as a read notices it.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    // == Set ==
    /// Stores `value`, replacing any previous entry for `key`.
    pub fn set(&mut self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry::new(key, value, self.clock.now_ms(), ttl, DEFAULT_PRIORITY);
        self.entries.insert(key.to_string(), entry);
    }

    // == Has ==
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Purge Expired ==
    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FastCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FastCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn cache_at(start: u64) -> (FastCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        (FastCache::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_set_and_get() {
        let (mut cache, _) = cache_at(0);

        cache.set("videos", json!([1, 2, 3]), Duration::from_secs(60));

        assert_eq!(cache.get("videos"), Some(json!([1, 2, 3])));
        assert!(cache.has("videos"));
    }

    #[test]
    fn test_get_missing() {
        let (mut cache, _) = cache_at(0);
        assert_eq!(cache.get("missing"), None);
        assert!(!cache.has("missing"));
    }

    #[test]
    fn test_overwrite_resets_ttl() {
        let (mut cache, clock) = cache_at(0);

        cache.set("k", json!("old"), Duration::from_millis(100));
        clock.advance(Duration::from_millis(90));
        cache.set("k", json!("new"), Duration::from_millis(100));
        clock.advance(Duration::from_millis(50));

        assert_eq!(cache.get("k"), Some(json!("new")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expiry_is_lazy_and_exact() {
        let (mut cache, clock) = cache_at(1_000);

        cache.set("k", json!(true), Duration::from_millis(500));
        clock.set(1_499);
        assert!(cache.has("k"));

        clock.set(1_500);
        assert_eq!(cache.get("k"), None);
        // the read removed it
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let (mut cache, _) = cache_at(0);
        cache.set("a", json!(1), Duration::from_secs(1));
        cache.set("b", json!(2), Duration::from_secs(1));

        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_purge_expired() {
        let (mut cache, clock) = cache_at(0);
        cache.set("short", json!(1), Duration::from_millis(10));
        cache.set("long", json!(2), Duration::from_secs(10));

        clock.advance(Duration::from_millis(20));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has("long"));
    }
}
