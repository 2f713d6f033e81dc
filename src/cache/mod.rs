//! Cache Module
//!
//! In-memory TTL cache for query results, a fixed-window request throttle
//! and a trailing-edge debouncer.

mod clock;
mod debounce;
mod entry;
mod order;
mod service;
mod stats;
mod store;
mod throttle;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use debounce::{debounce, Debouncer};
pub use entry::CacheEntry;
pub use order::InsertionOrder;
pub use service::CacheService;
pub use stats::CacheStats;
pub use store::{QueryCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_MS};
pub use throttle::{RequestThrottle, DEFAULT_THROTTLE_INTERVAL_MS};

/// TTL for gallery and project listings (2 minutes).
pub const LISTING_TTL_MS: u64 = 120_000;

/// TTL for tag and category metadata (5 minutes).
pub const METADATA_TTL_MS: u64 = 300_000;
