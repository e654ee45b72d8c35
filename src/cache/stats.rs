//! Cache Statistics Module
//!
//! Counts where reads were served from and how the fallback fetches went.

use serde::Serialize;

// == Cache Stats ==
/// Read-path counters of the multi-layer cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads answered by the fast layer
    pub fast_hits: u64,
    /// Reads answered by the durable store
    pub durable_hits: u64,
    /// Reads that had to call the fetcher
    pub fetches: u64,
    /// Fetcher calls that failed
    pub fetch_failures: u64,
    /// Durable store errors absorbed on the read path
    pub store_errors: u64,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of reads served without calling the fetcher, 0.0 when idle.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.fast_hits + self.durable_hits;
        let total = hits + self.fetches;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_fast_hit(&mut self) {
        self.fast_hits += 1;
    }

    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn record_store_error(&mut self) {
        self.store_errors += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_both_layers() {
        let mut stats = CacheStats::new();
        stats.record_fast_hit();
        stats.record_durable_hit();
        stats.record_fetch();
        stats.record_fetch();

        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_failures_do_not_change_hit_rate() {
        let mut stats = CacheStats::new();
        stats.record_fast_hit();
        stats.record_fetch();
        stats.record_fetch_failure();
        stats.record_store_error();

        assert_eq!(stats.hit_rate(), 0.5);
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(stats.store_errors, 1);
    }
}
