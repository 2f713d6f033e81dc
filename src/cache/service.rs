//! Cache Service Module
//!
//! Session-scoped facade over the query cache and the request throttle.
//! One instance is created per application state and handed to whoever
//! needs it; there is no process-wide singleton.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::{CacheStats, Clock, QueryCache, RequestThrottle, SystemClock};
use crate::config::Config;

// == Cache Service ==
/// Typed query cache plus request throttle.
///
/// None of these operations fail: absence or expiry is `None`, throttling is a `bool`.
#[derive(Debug)]
pub struct CacheService {
    cache: RwLock<QueryCache<Value>>,
    throttle: RwLock<RequestThrottle>,
}

impl CacheService {
    pub fn new(max_entries: usize, default_ttl_ms: u64) -> Self {
        Self::with_clock(max_entries, default_ttl_ms, Arc::new(SystemClock))
    }

    /// Builds the cache and the throttle on the same clock.
    pub fn with_clock(max_entries: usize, default_ttl_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: RwLock::new(QueryCache::with_clock(
                max_entries,
                default_ttl_ms,
                Arc::clone(&clock),
            )),
            throttle: RwLock::new(RequestThrottle::with_clock(clock)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_entries, config.default_ttl_ms)
    }

    // == Get ==
    /// Returns the cached value under `key` if present, unexpired and of type `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.write().await.get(key)?;

        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(key, error = %e, "cached value has unexpected shape, dropping it");
                self.cache.write().await.remove(key);
                None
            }
        }
    }

    // == Set ==
    /// Stores `data` under `key` for `ttl_ms`, or the default TTL.
    pub async fn set<T: Serialize>(&self, key: &str, data: &T, ttl_ms: Option<u64>) {
        match serde_json::to_value(data) {
            Ok(value) => self.cache.write().await.set(key, value, ttl_ms),
            Err(e) => warn!(key, error = %e, "value not cacheable, skipping"),
        }
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.cache.write().await.remove(key)
    }

    /// Drops every entry whose key starts with `prefix`.
    ///
    /// Throttle windows under the prefix are reopened too, so the next read
    /// after a write goes straight to the store.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let removed = self.cache.write().await.remove_prefix(prefix);
        self.throttle.write().await.reset_prefix(prefix);
        removed
    }

    /// Drops all cached entries. Throttle windows are left alone.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    // == Throttle ==
    /// `true` if a call under `key` was accepted within `min_interval_ms`.
    pub async fn should_throttle_request(&self, key: &str, min_interval_ms: u64) -> bool {
        self.throttle
            .write()
            .await
            .should_throttle(key, min_interval_ms)
    }

    // == Maintenance ==
    pub async fn cleanup_expired(&self) -> usize {
        self.cache.write().await.cleanup_expired()
    }

    pub async fn prune_throttle(&self, max_age_ms: u64) -> usize {
        self.throttle.write().await.prune_older_than(max_age_ms)
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.cache.read().await.stats();
        stats.throttle_entries = self.throttle.read().await.len();
        stats
    }
}
