//! Multi-Layer Cache Orchestrator
//!
//! Reads go fast layer, then durable store, then the caller's fetcher;
//! whatever is found further down is written back up. Writes go to both
//! layers before returning.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{lock, CacheStats, DurableStore, FastCache, DEFAULT_PRIORITY, DEFAULT_TTL};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

// == Multi-Layer Cache ==
/// Fast layer + durable store + fetch fallback behind one API.
///
/// Construct one per cache namespace and share it (usually behind an
/// `Arc`). Concurrent `get` calls for the same uncached key each run
/// their own fetcher.
pub struct MultiLayerCache {
    fast: Mutex<FastCache>,
    durable: Arc<dyn DurableStore>,
    stats: Mutex<CacheStats>,
}

impl MultiLayerCache {
    // == Constructor ==
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self::with_clock(durable, Arc::new(SystemClock))
    }

    /// Uses `clock` for fast-layer expiry. The durable store keeps its own.
    pub fn with_clock(durable: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fast: Mutex::new(FastCache::with_clock(clock)),
            durable,
            stats: Mutex::new(CacheStats::new()),
        }
    }

    // == Get ==
    /// [`get_with_ttl`](Self::get_with_ttl) with the 30 minute default.
    pub async fn get<T, E, F, Fut>(&self, key: &str, fetcher: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.get_with_ttl(key, DEFAULT_TTL, fetcher).await
    }

    /// Returns the cached value for `key`, calling `fetcher` only when
    /// neither layer has it.
    ///
    /// The fetcher runs at most once per call and its error is returned
    /// unchanged, with nothing cached. Durable store failures never fail a
    /// read: a broken read is a miss and a broken write-back is logged.
    pub async fn get_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let cached = lock(&self.fast).get(key);
        if let Some(data) = cached.and_then(|value| decode::<T>(key, value)) {
            debug!(key, "Fast cache hit");
            lock(&self.stats).record_fast_hit();
            return Ok(data);
        }

        match self.durable.get(key).await {
            Ok(Some(value)) => {
                if let Some(data) = decode::<T>(key, value.clone()) {
                    debug!(key, "Durable cache hit");
                    lock(&self.fast).set(key, value, ttl);
                    lock(&self.stats).record_durable_hit();
                    return Ok(data);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(key, error = %err, "Durable cache read failed, treating as miss");
                lock(&self.stats).record_store_error();
            }
        }

        debug!(key, "Cache miss, fetching");
        lock(&self.stats).record_fetch();
        let data = match fetcher().await {
            Ok(data) => data,
            Err(err) => {
                lock(&self.stats).record_fetch_failure();
                return Err(err);
            }
        };

        match serde_json::to_value(&data) {
            Ok(value) => {
                lock(&self.fast).set(key, value.clone(), ttl);
                if let Err(err) = self.durable.set(key, value, ttl, DEFAULT_PRIORITY).await {
                    warn!(key, error = %err, "Durable cache write-back failed");
                    lock(&self.stats).record_store_error();
                }
            }
            Err(err) => warn!(key, error = %err, "Fetched value is not serializable, not cached"),
        }

        Ok(data)
    }

    // == Set ==
    /// Writes `data` to both layers with the default TTL and priority.
    pub async fn set<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        self.set_with(key, data, DEFAULT_TTL, DEFAULT_PRIORITY).await
    }

    /// Writes `data` to both layers. Durable store errors are returned.
    pub async fn set_with<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl: Duration,
        priority: u8,
    ) -> Result<()> {
        let value = serde_json::to_value(data)?;
        lock(&self.fast).set(key, value.clone(), ttl);
        self.durable.set(key, value, ttl, priority).await
    }

    // == Invalidate ==
    /// Drops the whole fast layer and `key` from the durable store.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        lock(&self.fast).clear();
        self.durable.delete(key).await?;
        debug!(key, "Cache key invalidated");
        Ok(())
    }

    // == Clear ==
    pub async fn clear(&self) -> Result<()> {
        lock(&self.fast).clear();
        self.durable.clear().await
    }

    // == Inspection ==
    /// Whether the fast layer currently holds an unexpired value for `key`.
    pub fn contains_fast(&self, key: &str) -> bool {
        lock(&self.fast).has(key)
    }

    pub fn fast_len(&self) -> usize {
        lock(&self.fast).len()
    }

    /// Removes expired fast-layer entries. Reads already ignore them, so
    /// this only reclaims memory.
    pub fn sweep_expired(&self) -> usize {
        lock(&self.fast).purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.stats).clone()
    }

    pub fn durable(&self) -> &Arc<dyn DurableStore> {
        &self.durable
    }
}

impl std::fmt::Debug for MultiLayerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLayerCache")
            .field("fast", &*lock(&self.fast))
            .field("stats", &*lock(&self.stats))
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(data) => Some(data),
        Err(err) => {
            warn!(key, error = %err, "Cached value has an unexpected shape, ignoring it");
            None
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::clock::ManualClock;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Article {
        id: u32,
        title: String,
    }

    fn article() -> Article {
        Article {
            id: 7,
            title: "Contract formation".into(),
        }
    }

    fn cache() -> (MultiLayerCache, Arc<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryStore::with_clock(100, clock.clone()));
        let cache = MultiLayerCache::with_clock(store.clone(), clock.clone());
        (cache, store, clock)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_populates_both_layers() {
        let (cache, store, _) = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let got: Article = cache
            .get("article:7", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(article())
            })
            .await
            .unwrap();

        assert_eq!(got, article());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(cache.contains_fast("article:7"));
        assert!(store.get("article:7").await.unwrap().is_some());
        assert_eq!(cache.stats().fetches, 1);
    }

    #[tokio::test]
    async fn test_second_read_is_fast_hit() {
        let (cache, _, _) = cache();
        cache.set("article:7", &article()).await.unwrap();

        let got: Article = cache
            .get("article:7", || async { Err::<Article, _>("must not fetch") })
            .await
            .unwrap();

        assert_eq!(got, article());
        assert_eq!(cache.stats().fast_hits, 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_returned_verbatim() {
        let (cache, store, _) = cache();

        let result: std::result::Result<Article, &str> =
            cache.get("k", || async { Err("offline") }).await;

        assert_eq!(result.unwrap_err(), "offline");
        assert!(!cache.contains_fast("k"));
        assert!(store.is_empty());
        assert_eq!(cache.stats().fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_a_miss() {
        let (cache, _, _) = cache();
        cache.set("k", &"just a string").await.unwrap();

        let got: Article = cache
            .get("k", || async { Ok::<_, String>(article()) })
            .await
            .unwrap();

        assert_eq!(got, article());
        assert_eq!(cache.stats().fetches, 1);
    }

    #[tokio::test]
    async fn test_custom_ttl_expires_fast_layer() {
        let (cache, _, clock) = cache();

        let _: u32 = cache
            .get_with_ttl("n", Duration::from_millis(100), || async { Ok::<_, String>(1) })
            .await
            .unwrap();
        assert!(cache.contains_fast("n"));
        clock.advance(Duration::from_millis(100));

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.fast_len(), 0);
        assert!(!cache.contains_fast("n"));
    }

    #[tokio::test]
    async fn test_clear_empties_both_layers() {
        let (cache, store, _) = cache();
        cache.set("a", &1).await.unwrap();
        cache.set_with("b", &2, DEFAULT_TTL, 3).await.unwrap();

        cache.clear().await.unwrap();

        assert_eq!(cache.fast_len(), 0);
        assert!(store.is_empty());
    }
}
