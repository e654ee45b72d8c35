//! Layered Cache - client-side multi-layer cache with prefetching
//!
//! A fast in-memory layer and a durable on-device store in front of a
//! caller-supplied fetch, plus a connection-aware prefetch engine that warms
//! the durable store ahead of navigation.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod prefetch;
pub mod tasks;

pub use api::AppState;
pub use cache::{DurableStore, FileStore, MemoryStore, MultiLayerCache};
pub use config::Config;
pub use connection::{ConnectionMonitor, ConnectionQuality, ConnectionSignal};
pub use error::{CacheError, Result};
pub use prefetch::{HttpFetcher, PrefetchEngine, ResourceFetcher};
pub use tasks::spawn_sweep_task;
