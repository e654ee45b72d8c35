//! File-backed durable store
//!
//! Keeps a [`DurableIndex`] in memory and mirrors it to a JSON snapshot on
//! disk after every mutation, so the cache survives restarts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, DurableIndex, DurableStore};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

/// Snapshot file name inside the cache directory.
pub const SNAPSHOT_FILE: &str = "durable-cache.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    entries: Vec<CacheEntry>,
}

// == File Store ==
/// Persistent [`DurableStore`] rooted in a directory.
///
/// Reads only take the index lock, which is never held across disk I/O.
/// Each mutation serializes the index under that lock, tagged with a
/// generation, and the snapshot is written afterwards behind a separate
/// writer lock that skips anything older than what is already on disk.
///
/// A failed write is returned to the caller but the in-memory change stays.
/// Every snapshot holds the full index, so the disk catches up on the next
/// successful write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    index: Mutex<DurableIndex>,
    generation: AtomicU64,
    /// Generation of the snapshot currently on disk
    written: Mutex<u64>,
}

impl FileStore {
    // == Open ==
    /// Opens (or creates) the store in `dir`.
    ///
    /// An unreadable snapshot is not fatal: it is logged and the store
    /// starts empty, overwriting it on the next write.
    pub async fn open(dir: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        Self::open_with_clock(dir, capacity, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        dir: impl AsRef<Path>,
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(SNAPSHOT_FILE);

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Snapshot>(&bytes) {
                Ok(snapshot) => snapshot.entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Discarding unreadable cache snapshot");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let index = DurableIndex::from_entries(entries, capacity, clock);
        info!(path = %path.display(), entries = index.len(), capacity = index.capacity(), "Durable cache opened");

        Ok(Self {
            path,
            index: Mutex::new(index),
            generation: AtomicU64::new(0),
            written: Mutex::new(0),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }

    // == Persist ==
    /// Serializes `index`. Must be called with the index lock held so
    /// generations follow mutation order.
    fn encode(&self, index: &DurableIndex) -> Result<(u64, Vec<u8>)> {
        let snapshot = Snapshot {
            entries: index.snapshot(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((generation, bytes))
    }

    /// Writes the snapshot to a temp file and renames it over the old one,
    /// unless a newer generation already landed.
    async fn persist(&self, generation: u64, bytes: Vec<u8>) -> Result<()> {
        let mut written = self.written.lock().await;
        if *written >= generation {
            debug!(generation, on_disk = *written, "Newer cache snapshot already written");
            return Ok(());
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        *written = generation;

        debug!(generation, bytes = bytes.len(), "Cache snapshot written");
        Ok(())
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.index.lock().await.get(key))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration, priority: u8) -> Result<()> {
        let (generation, bytes) = {
            let mut index = self.index.lock().await;
            let evicted = index.set(key, value, ttl, priority);
            if !evicted.is_empty() {
                debug!(key, evicted = ?evicted, "File store evicted entries");
            }
            self.encode(&index)?
        };
        self.persist(generation, bytes).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let (generation, bytes) = {
            let mut index = self.index.lock().await;
            if !index.delete(key) {
                return Ok(());
            }
            self.encode(&index)?
        };
        self.persist(generation, bytes).await
    }

    async fn clear(&self) -> Result<()> {
        let (generation, bytes) = {
            let mut index = self.index.lock().await;
            index.clear();
            self.encode(&index)?
        };
        self.persist(generation, bytes).await
    }
}
