//! Durable Cache Store
//!
//! The contract the orchestrator and the prefetch engine rely on, plus the
//! capacity-bounded index shared by the concrete stores.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::cache::{lock, CacheEntry};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

// == Durable Store Contract ==
/// Persistent, capacity-bounded key/value store.
///
/// `get` returns `None` both for keys never written and for expired ones.
/// `priority` only decides what is evicted first when the store is full;
/// it never affects what a read returns. Individual calls must be atomic
/// per key; there is no cross-call locking.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: Duration, priority: u8) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    last_access: u64,
}

// == Durable Index ==
/// Synchronous core of a durable store.
///
/// When a new key arrives at capacity, expired entries go first; after
/// that the lowest priority entry is evicted, least recently used among
/// equals. Overwriting an existing key never evicts.
pub struct DurableIndex {
    slots: HashMap<String, Slot>,
    capacity: usize,
    tick: u64,
    evictions: u64,
    clock: Arc<dyn Clock>,
}

impl DurableIndex {
    // == Constructor ==
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: HashMap::new(),
            capacity: capacity.max(1),
            tick: 0,
            evictions: 0,
            clock,
        }
    }

    /// Rebuilds an index from a snapshot, oldest access first. Expired
    /// entries are skipped and overflow beyond `capacity` is evicted.
    pub fn from_entries(entries: Vec<CacheEntry>, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let mut index = Self::new(capacity, clock);
        let now = index.clock.now_ms();
        for entry in entries.into_iter().filter(|e| !e.is_expired(now)) {
            index.insert_entry(entry);
        }
        index
    }

    // == Get ==
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();
        let expired = self.slots.get(key)?.entry.is_expired(now);
        if expired {
            self.slots.remove(key);
            return None;
        }

        let tick = self.next_tick();
        let slot = self.slots.get_mut(key)?;
        slot.last_access = tick;
        Some(slot.entry.value.clone())
    }

    // == Set ==
    /// Stores an entry and returns the keys evicted to make room.
    pub fn set(&mut self, key: &str, value: Value, ttl: Duration, priority: u8) -> Vec<String> {
        let entry = CacheEntry::new(key, value, self.clock.now_ms(), ttl, priority);
        self.insert_entry(entry)
    }

    fn insert_entry(&mut self, entry: CacheEntry) -> Vec<String> {
        let mut evicted = Vec::new();

        if !self.slots.contains_key(&entry.key) && self.slots.len() >= self.capacity {
            self.purge_expired();
            while self.slots.len() >= self.capacity {
                match self.evict_one() {
                    Some(key) => evicted.push(key),
                    None => break,
                }
            }
        }

        let last_access = self.next_tick();
        self.slots.insert(entry.key.clone(), Slot { entry, last_access });
        evicted
    }

    fn evict_one(&mut self) -> Option<String> {
        let victim = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| (slot.entry.priority, slot.last_access))
            .map(|(key, _)| key.clone())?;
        self.slots.remove(&victim);
        self.evictions += 1;
        Some(victim)
    }

    // == Delete ==
    /// Returns whether the key was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    // == Purge Expired ==
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.entry.is_expired(now));
        before - self.slots.len()
    }

    // == Snapshot ==
    /// All entries ordered from least to most recently used.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut slots: Vec<&Slot> = self.slots.values().collect();
        slots.sort_by_key(|slot| slot.last_access);
        slots.into_iter().map(|slot| slot.entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of entries evicted for capacity since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

impl std::fmt::Debug for DurableIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableIndex")
            .field("entries", &self.slots.len())
            .field("capacity", &self.capacity)
            .field("evictions", &self.evictions)
            .finish()
    }
}

// == Memory Store ==
/// Non-persistent [`DurableStore`], for tests and ephemeral sessions.
#[derive(Debug)]
pub struct MemoryStore {
    index: Mutex<DurableIndex>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            index: Mutex::new(DurableIndex::new(capacity, clock)),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.index).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.index).is_empty()
    }

    pub fn evictions(&self) -> u64 {
        lock(&self.index).evictions()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(lock(&self.index).get(key))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration, priority: u8) -> Result<()> {
        let evicted = lock(&self.index).set(key, value, ttl, priority);
        if !evicted.is_empty() {
            debug!(key, evicted = ?evicted, "Memory store evicted entries");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        lock(&self.index).delete(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        lock(&self.index).clear();
        Ok(())
    }
}
