//! Prefetch Engine
//!
//! Priority queue of URLs to warm into the durable store ahead of use.
//! Work is drained in batches of at most `max_concurrent` tasks; batches
//! run one after another with a short pause in between.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::cache::{lock, DurableStore, DEFAULT_TTL};
use crate::connection::{ConnectionQuality, ConnectionSignal};
use crate::error::{CacheError, Result};
use crate::prefetch::ResourceFetcher;

// == Priorities ==
/// Lowest priority still queued on a slow connection
pub const SLOW_LINK_MIN_PRIORITY: u8 = 3;
/// Priority of [`PrefetchEngine::on_hover`] tasks
pub const HOVER_PRIORITY: u8 = 2;
/// Priority of [`PrefetchEngine::prefetch_from_history`] tasks
pub const HISTORY_PRIORITY: u8 = 1;

// == Prefetch Task ==
/// One URL to warm. The URL doubles as the durable cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchTask {
    pub url: String,
    pub priority: u8,
}

// == Configuration ==
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Tasks per batch; zero is treated as one
    pub max_concurrent: usize,
    /// TTL of prefetched entries
    pub ttl: Duration,
    /// Durable priority of prefetched entries
    pub store_priority: u8,
    /// Pause between batches
    pub yield_delay: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            ttl: DEFAULT_TTL,
            store_priority: 2,
            yield_delay: Duration::from_millis(100),
        }
    }
}

// == Statistics ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrefetchStats {
    /// Tasks accepted into the queue
    pub enqueued: u64,
    /// Tasks refused by slow-link gating
    pub dropped: u64,
    /// Tasks that fetched and stored their URL
    pub stored: u64,
    /// Tasks skipped because the store already had the URL
    pub already_cached: u64,
    /// Tasks that failed (logged, never retried)
    pub failed: u64,
    /// Batches drained
    pub batches: u64,
}

enum Outcome {
    Stored,
    AlreadyCached,
}

#[derive(Default)]
struct QueueState {
    /// Sorted by descending priority
    tasks: Vec<PrefetchTask>,
    /// Guard: true while a drain loop is running
    processing: bool,
}

struct EngineInner {
    state: Mutex<QueueState>,
    idle: Notify,
    store: Arc<dyn DurableStore>,
    fetcher: Arc<dyn ResourceFetcher>,
    signal: Arc<dyn ConnectionSignal>,
    config: PrefetchConfig,
    stats: Mutex<PrefetchStats>,
}

// == Prefetch Engine ==
/// Best-effort cache warmer. Cloning shares the same queue.
///
/// Enqueueing starts a drain loop on the current tokio runtime when none is
/// running. Outside a runtime nothing can drain the queue, so tasks are
/// refused. Failures are logged and never reach the caller.
#[derive(Clone)]
pub struct PrefetchEngine {
    inner: Arc<EngineInner>,
}

impl PrefetchEngine {
    // == Constructor ==
    pub fn new(
        store: Arc<dyn DurableStore>,
        fetcher: Arc<dyn ResourceFetcher>,
        signal: Arc<dyn ConnectionSignal>,
    ) -> Self {
        Self::with_config(store, fetcher, signal, PrefetchConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn DurableStore>,
        fetcher: Arc<dyn ResourceFetcher>,
        signal: Arc<dyn ConnectionSignal>,
        mut config: PrefetchConfig,
    ) -> Self {
        config.max_concurrent = config.max_concurrent.max(1);
        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                store,
                fetcher,
                signal,
                config,
                stats: Mutex::new(PrefetchStats::default()),
            }),
        }
    }

    // == Add ==
    /// Queues `url` unless the link is slow and `priority` is below
    /// [`SLOW_LINK_MIN_PRIORITY`]. Returns whether the task was queued.
    pub fn add(&self, url: impl Into<String>, priority: u8) -> bool {
        let url = url.into();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(url = %url, "No tokio runtime, prefetch dropped");
            lock(&self.inner.stats).dropped += 1;
            return false;
        };

        let quality = self.inner.signal.quality();
        if quality == ConnectionQuality::Slow && priority < SLOW_LINK_MIN_PRIORITY {
            debug!(url = %url, priority, "Slow connection, prefetch dropped");
            lock(&self.inner.stats).dropped += 1;
            return false;
        }

        let start = {
            let mut state = lock(&self.inner.state);
            state.tasks.push(PrefetchTask { url, priority });
            state.tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
            !std::mem::replace(&mut state.processing, true)
        };
        lock(&self.inner.stats).enqueued += 1;

        if start {
            let inner = self.inner.clone();
            runtime.spawn(inner.drain());
        }
        true
    }

    /// Pointer is resting on a link: medium priority.
    pub fn on_hover(&self, url: impl Into<String>) -> bool {
        self.add(url, HOVER_PRIORITY)
    }

    /// Recently visited pages: lowest priority. Returns how many were queued.
    pub fn prefetch_from_history<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter()
            .map(|url| self.add(url, HISTORY_PRIORITY))
            .filter(|queued| *queued)
            .count()
    }

    // == Inspection ==
    /// Tasks waiting for a batch (not counting the batch in flight).
    pub fn queue_len(&self) -> usize {
        lock(&self.inner.state).tasks.len()
    }

    pub fn is_processing(&self) -> bool {
        lock(&self.inner.state).processing
    }

    /// Resolves once the engine is idle with an empty queue.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if !self.is_processing() {
                return;
            }
            notified.await;
        }
    }

    pub fn stats(&self) -> PrefetchStats {
        lock(&self.inner.stats).clone()
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for PrefetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchEngine")
            .field("config", &self.inner.config)
            .field("queued", &self.queue_len())
            .field("processing", &self.is_processing())
            .finish()
    }
}

impl EngineInner {
    // == Drain Loop ==
    async fn drain(self: Arc<Self>) {
        loop {
            let batch: Vec<PrefetchTask> = {
                let mut state = lock(&self.state);
                if state.tasks.is_empty() {
                    // Cleared under the lock, so an `add` racing with us
                    // either lands before this check or starts a new loop.
                    state.processing = false;
                    break;
                }
                let take = self.config.max_concurrent.min(state.tasks.len());
                state.tasks.drain(..take).collect()
            };

            debug!(size = batch.len(), "Prefetch batch started");
            join_all(batch.iter().map(|task| self.run_task(task))).await;
            lock(&self.stats).batches += 1;

            let remaining = lock(&self.state).tasks.len();
            if remaining > 0 {
                tokio::time::sleep(self.config.yield_delay).await;
            }
        }

        debug!("Prefetch queue drained");
        self.idle.notify_waiters();
    }

    async fn run_task(&self, task: &PrefetchTask) {
        let result = AssertUnwindSafe(self.prefetch_one(&task.url))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(CacheError::Internal("prefetch task panicked".into())));

        let mut stats = lock(&self.stats);
        match result {
            Ok(Outcome::Stored) => {
                info!(url = %task.url, priority = task.priority, "Prefetched");
                stats.stored += 1;
            }
            Ok(Outcome::AlreadyCached) => {
                debug!(url = %task.url, "Prefetch skipped, already cached");
                stats.already_cached += 1;
            }
            Err(err) => {
                warn!(url = %task.url, error = %err, "Prefetch failed");
                stats.failed += 1;
            }
        }
    }

    async fn prefetch_one(&self, url: &str) -> Result<Outcome> {
        match self.store.get(url).await {
            Ok(Some(_)) => return Ok(Outcome::AlreadyCached),
            Ok(None) => {}
            Err(err) => debug!(url, error = %err, "Durable lookup failed, fetching anyway"),
        }

        let value = self.fetcher.fetch_json(url).await?;
        self.store
            .set(url, value, self.config.ttl, self.config.store_priority)
            .await?;
        Ok(Outcome::Stored)
    }
}
