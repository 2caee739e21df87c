//! Bounded in-memory mirror store.
//!
//! Keys come from [`super::keys`]; values are opaque serialized blobs. The
//! store is shared by every adapter (writers) and every request handler
//! (readers); the interior `RwLock` serializes mutation while prefix scans
//! run under the read half.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "mirror::store";

const METRIC_STORE_HIT: &str = "floe_store_hit_total";
const METRIC_STORE_MISS: &str = "floe_store_miss_total";
const METRIC_STORE_EVICT: &str = "floe_store_evict_total";

/// Cumulative store counters since process start.
///
/// The store has no read-through loader, so the `load_*` counters are part
/// of the surface but stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub eviction_weight: u64,
    pub load_successes: u64,
    pub load_failures: u64,
    pub total_load_time: Duration,
}

/// Expected, non-exceptional store outcomes.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,
}

/// Key/prefix-indexed store backing the mirror.
///
/// Implementations must be bounded in size, record eviction counts, and keep
/// per-key mutation serialized with respect to concurrent readers.
pub trait MirrorStore: Send + Sync {
    /// Insert or overwrite. May evict an unrelated entry at capacity.
    fn set(&self, key: &str, value: Bytes);

    fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Every resident entry whose key starts with `prefix`, key-ordered.
    fn get_all(&self, prefix: &str) -> BTreeMap<String, Bytes>;

    fn count(&self, prefix: &str) -> usize;

    /// Deleting an absent key reports [`StoreError::NotFound`]; absence is
    /// the postcondition either way, so callers treat it as non-fatal.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    fn stats(&self) -> StoreStats;

    /// Release resources. Safe to call once; operations after close are
    /// undefined.
    fn close(&self);
}

/// LRU-evicting [`MirrorStore`] implementation.
pub struct LruMirrorStore {
    entries: RwLock<LruCache<String, Bytes>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    eviction_weight: AtomicU64,
}

impl LruMirrorStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            eviction_weight: AtomicU64::new(0),
        }
    }
}

impl MirrorStore for LruMirrorStore {
    fn set(&self, key: &str, value: Bytes) {
        let displaced = rw_write(&self.entries, SOURCE, "set").push(key.to_string(), value);

        // `push` also returns the previous value on overwrite; only an
        // unrelated displaced key is a capacity eviction.
        if let Some((displaced_key, displaced_value)) = displaced
            && displaced_key != key
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            self.eviction_weight
                .fetch_add(displaced_value.len() as u64, Ordering::Relaxed);
            counter!(METRIC_STORE_EVICT).increment(1);
            debug!(key = %displaced_key, "Evicted mirror entry at capacity");
        }
    }

    fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        // Write guard: a hit promotes the entry in LRU order.
        match rw_write(&self.entries, SOURCE, "get").get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                counter!(METRIC_STORE_HIT).increment(1);
                Ok(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                counter!(METRIC_STORE_MISS).increment(1);
                Err(StoreError::NotFound)
            }
        }
    }

    fn get_all(&self, prefix: &str) -> BTreeMap<String, Bytes> {
        // Scans use `iter`, which does not disturb recency order.
        rw_read(&self.entries, SOURCE, "get_all")
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn count(&self, prefix: &str) -> usize {
        rw_read(&self.entries, SOURCE, "count")
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .count()
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match rw_write(&self.entries, SOURCE, "delete").pop(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            eviction_weight: self.eviction_weight.load(Ordering::Relaxed),
            load_successes: 0,
            load_failures: 0,
            total_load_time: Duration::ZERO,
        }
    }

    fn close(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "close");
        info!(resident = entries.len(), "Closing mirror store");
        entries.clear();
    }
}
