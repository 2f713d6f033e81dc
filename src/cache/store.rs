//! Query Cache Module
//!
//! Main cache engine combining HashMap storage with insertion-order tracking
//! and lazy TTL expiration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, InsertionOrder, SystemClock};

/// Default capacity of a query cache.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default TTL in milliseconds (two minutes, suited to listings).
pub const DEFAULT_TTL_MS: u64 = 120_000;

// == Query Cache ==
/// Bounded TTL cache for query results.
///
/// Overflow eviction is FIFO by first insertion: when the cache is full and
/// no expired entries can be purged, the oldest inserted key is dropped.
#[derive(Debug)]
pub struct QueryCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    order: InsertionOrder,
    stats: CacheStats,
    max_entries: usize,
    default_ttl: u64,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> QueryCache<T> {
    // == Constructor ==
    /// Creates a cache with the given capacity and default TTL (ms), on the system clock.
    pub fn new(max_entries: usize, default_ttl: u64) -> Self {
        Self::with_clock(max_entries, default_ttl, Arc::new(SystemClock))
    }

    /// Creates a cache driven by an explicit clock.
    ///
    /// A capacity of zero is clamped to one.
    pub fn with_clock(max_entries: usize, default_ttl: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            default_ttl,
            clock,
        }
    }

    // == Get ==
    /// Returns the cached value if present and unexpired.
    ///
    /// An expired entry found here is removed on the spot.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.order.remove(key);
            self.stats.record_miss();
            debug!(key, "cache entry expired on read");
            return None;
        }

        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    // == Set ==
    /// Stores a value under `key` with `ttl` ms, or the default TTL if `None`.
    ///
    /// Overwriting an existing key never evicts. Inserting a new key into a
    /// full cache first purges expired entries, then drops the oldest inserted
    /// entry if the cache is still full.
    pub fn set(&mut self, key: impl Into<String>, data: T, ttl: Option<u64>) {
        let key = key.into();
        let now = self.clock.now_ms();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let purged = self.cleanup_expired();
            if purged > 0 {
                debug!(purged, "purged expired entries to make room");
            }

            while self.entries.len() >= self.max_entries {
                match self.order.evict_oldest() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                        self.stats.record_evictions(1);
                        debug!(key = %oldest, "evicted oldest cache entry");
                    }
                    None => break,
                }
            }
        }

        let entry = CacheEntry::new(data, now, ttl.unwrap_or(self.default_ttl));
        self.entries.insert(key.clone(), entry);
        self.order.record(&key);
    }

    // == Remove ==
    /// Drops a single entry. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.order.remove(key);
        self.entries.remove(key).is_some()
    }

    /// Drops every entry whose key starts with `prefix`. Returns how many.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &keys {
            self.remove(key);
        }
        keys.len()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.order.remove(key);
        }

        self.stats.record_evictions(expired_keys.len());
        expired_keys.len()
    }

    // == Stats ==
    /// Snapshot of entry counts and lookup counters. Does not purge anything.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .count();

        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.expired_entries = expired;
        stats.valid_entries = self.entries.len() - expired;
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}
