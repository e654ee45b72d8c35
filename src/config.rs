//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::prefetch::PrefetchConfig;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Directory holding the durable cache snapshot
    pub cache_dir: PathBuf,
    /// Maximum number of entries in the durable store
    pub durable_capacity: usize,
    /// TTL in milliseconds for reads and writes that don't pass one
    pub default_ttl_ms: u64,
    /// Prefetch tasks per batch
    pub prefetch_max_concurrent: usize,
    /// Pause between prefetch batches in milliseconds
    pub prefetch_yield_ms: u64,
    /// Fast-layer sweep interval in seconds, 0 disables the sweep
    pub sweep_interval: u64,
    /// Upstream request timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Effective connection type reported at startup, if known
    pub connection_type: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DIR` - Durable cache directory (default: ./cache-data)
    /// - `DURABLE_CAPACITY` - Durable store entries (default: 500)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 1800000)
    /// - `PREFETCH_MAX_CONCURRENT` - Prefetch batch size (default: 3)
    /// - `PREFETCH_YIELD_MS` - Pause between batches (default: 100)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `FETCH_TIMEOUT_SECS` - Upstream timeout in seconds (default: 15)
    /// - `CONNECTION_TYPE` - Initial effective type, e.g. `4g` (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            durable_capacity: parse_var("DURABLE_CAPACITY").unwrap_or(defaults.durable_capacity),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            prefetch_max_concurrent: parse_var("PREFETCH_MAX_CONCURRENT")
                .unwrap_or(defaults.prefetch_max_concurrent),
            prefetch_yield_ms: parse_var("PREFETCH_YIELD_MS").unwrap_or(defaults.prefetch_yield_ms),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            fetch_timeout_secs: parse_var("FETCH_TIMEOUT_SECS")
                .unwrap_or(defaults.fetch_timeout_secs),
            connection_type: env::var("CONNECTION_TYPE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// `None` when the sweep is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    pub fn prefetch_config(&self) -> PrefetchConfig {
        PrefetchConfig {
            max_concurrent: self.prefetch_max_concurrent,
            yield_delay: Duration::from_millis(self.prefetch_yield_ms),
            ..PrefetchConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_dir: PathBuf::from("./cache-data"),
            durable_capacity: 500,
            default_ttl_ms: 1_800_000,
            prefetch_max_concurrent: 3,
            prefetch_yield_ms: 100,
            sweep_interval: 60,
            fetch_timeout_secs: 15,
            connection_type: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
