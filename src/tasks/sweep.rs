//! Fast-layer sweep task
//!
//! Background task that periodically drops expired fast-layer entries so
//! memory does not grow with dead keys. Reads never depend on it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MultiLayerCache;

/// Spawns the sweep loop.
///
/// The task sleeps `interval` between runs and lives until the returned
/// handle is aborted.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(MultiLayerCache::new(store));
/// let sweep = spawn_sweep_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep.abort();
/// ```
pub fn spawn_sweep_task(cache: Arc<MultiLayerCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs_f64(), "Starting fast-layer sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.sweep_expired();
            if removed > 0 {
                info!("Fast-layer sweep: removed {} expired entries", removed);
            } else {
                debug!("Fast-layer sweep: no expired entries found");
            }
        }
    })
}
