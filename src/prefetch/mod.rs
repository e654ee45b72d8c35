//! Prefetch Module
//!
//! Speculative cache warming: a connection-aware priority queue that fills
//! the durable store before the user navigates.

mod engine;
mod fetch;

pub use engine::{
    PrefetchConfig, PrefetchEngine, PrefetchStats, PrefetchTask, HISTORY_PRIORITY,
    HOVER_PRIORITY, SLOW_LINK_MIN_PRIORITY,
};
pub use fetch::{HttpFetcher, ResourceFetcher};
