//! Cache Cleanup Task
//!
//! Background task that periodically purges expired cache entries and
//! forgets throttle windows that can no longer throttle anything.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheService;

/// Spawns a background task that periodically cleans up the cache service.
///
/// Each run removes expired cache entries and drops throttle keys whose
/// last accepted call is older than `throttle_interval_ms`.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheService::new(100, 120_000));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60, 1_000);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    cache: Arc<CacheService>,
    cleanup_interval_secs: u64,
    throttle_interval_ms: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let expired = cache.cleanup_expired().await;
            let stale_windows = cache.prune_throttle(throttle_interval_ms).await;

            if expired > 0 || stale_windows > 0 {
                info!(expired, stale_windows, "cache cleanup");
            } else {
                debug!("cache cleanup: nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn service() -> (Arc<CacheService>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        (
            Arc::new(CacheService::with_clock(100, 120_000, clock.clone())),
            clock,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let (cache, clock) = service();
        cache.set("expire_soon", &"value", Some(1_000)).await;
        cache.set("long_lived", &"value", Some(3_600_000)).await;
        clock.advance(2_000);

        let handle = spawn_cleanup_task(cache.clone(), 1, 1_000);
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(cache.get::<String>("long_lived").await.as_deref(), Some("value"));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_prunes_throttle_windows() {
        let (cache, clock) = service();
        assert!(!cache.should_throttle_request("gallery:all", 1_000).await);
        clock.advance(5_000);

        let handle = spawn_cleanup_task(cache.clone(), 1, 1_000);
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(cache.stats().await.throttle_entries, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let (cache, _) = service();
        let handle = spawn_cleanup_task(cache, 1, 1_000);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
