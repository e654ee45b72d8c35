//! Cache Module
//!
//! Two cache layers (fast in-memory, durable on-device) composed by
//! [`MultiLayerCache`] with a caller-supplied fetch as the last resort.

mod durable;
mod entry;
mod fast;
mod file_store;
mod orchestrator;
mod stats;


use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// Re-export public types
pub use durable::{DurableIndex, DurableStore, MemoryStore};
pub use entry::CacheEntry;
pub use fast::FastCache;
pub use file_store::{FileStore, SNAPSHOT_FILE};
pub use orchestrator::MultiLayerCache;
pub use stats::CacheStats;

// == Public Constants ==
/// TTL applied when the caller does not pass one (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_millis(1_800_000);

/// Retention priority applied when the caller does not pass one
pub const DEFAULT_PRIORITY: u8 = 1;

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
