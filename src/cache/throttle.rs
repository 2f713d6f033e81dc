//! Request Throttle Module
//!
//! Fixed-window limiter keyed per logical request.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{Clock, SystemClock};

/// Default minimum interval between accepted calls under one key.
pub const DEFAULT_THROTTLE_INTERVAL_MS: u64 = 1_000;

// == Request Throttle ==
/// Remembers when each logical request was last let through.
#[derive(Debug)]
pub struct RequestThrottle {
    last_accepted: HashMap<String, u64>,
    clock: Arc<dyn Clock>,
}

impl RequestThrottle {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            last_accepted: HashMap::new(),
            clock,
        }
    }

    // == Should Throttle ==
    /// Returns `true` if a call under `key` was accepted less than
    /// `min_interval_ms` ago, in which case the caller should skip it.
    ///
    /// Otherwise records now as the accepted time and returns `false`.
    /// A throttled call does not move the window.
    pub fn should_throttle(&mut self, key: &str, min_interval_ms: u64) -> bool {
        let now = self.clock.now_ms();

        if let Some(&last) = self.last_accepted.get(key) {
            if now.saturating_sub(last) < min_interval_ms {
                return true;
            }
        }

        self.last_accepted.insert(key.to_string(), now);
        false
    }

    // == Prune ==
    /// Forgets keys whose last accepted call is older than `max_age_ms`.
    pub fn prune_older_than(&mut self, max_age_ms: u64) -> usize {
        let now = self.clock.now_ms();
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, last| now.saturating_sub(*last) <= max_age_ms);
        before - self.last_accepted.len()
    }

    /// Reopens the window of every key starting with `prefix`.
    pub fn reset_prefix(&mut self, prefix: &str) -> usize {
        let before = self.last_accepted.len();
        self.last_accepted.retain(|key, _| !key.starts_with(prefix));
        before - self.last_accepted.len()
    }

    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new()
    }
}
