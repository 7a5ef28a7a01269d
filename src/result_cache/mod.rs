//! Time-bounded result cache with bulk purge
//!
//! Entries are valid while `now - stored_at < ttl`. A zero TTL never yields
//! a hit, which is how caching is switched off. Once the entry count goes
//! past the high-water mark, the oldest half by insertion order is dropped
//! in one pass. This is not LRU: reads never reorder entries.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::utils::constants::CACHE_MAX_ENTRIES;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Keys in first-insertion order; rewriting a key keeps its slot
    order: VecDeque<String>,
}

pub struct ResultCache<V> {
    ttl: Duration,
    max_entries: usize,
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone> ResultCache<V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_entries(ttl, CACHE_MAX_ENTRIES)
    }

    #[must_use]
    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// The stored value if it is still within its TTL
    ///
    /// Expired entries are left in place; the bulk purge reclaims them.
    pub fn get(&self, key: &str) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }

        let inner = self.inner.lock();
        let entry = inner.entries.get(key)?;
        (entry.stored_at.elapsed() < self.ttl).then(|| entry.value.clone())
    }

    /// Store `value` under `key`, purging the oldest half if over the limit
    ///
    /// Returns how many entries were purged.
    pub fn put(&self, key: impl Into<String>, value: V) -> usize {
        let key = key.into();
        let mut inner = self.inner.lock();

        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        if inner.entries.insert(key.clone(), entry).is_none() {
            inner.order.push_back(key);
        }

        if inner.entries.len() <= self.max_entries {
            return 0;
        }

        let purge = inner.entries.len() / 2;
        for _ in 0..purge {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        info!(
            purged = purge,
            remaining = inner.entries.len(),
            "Result cache over limit, purged oldest entries"
        );
        purge
    }

    /// Empty the cache, returning how many entries it held
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let cleared = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        debug!(cleared, "Result cache cleared");
        cleared
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<V> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .field("len", &self.inner.lock().entries.len())
            .finish()
    }
}
