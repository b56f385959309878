//! Background purge of expired entries

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::cache::QueryCache;

/// Spawns a task that calls [`QueryCache::purge_expired`] every `interval`.
///
/// The task runs until the returned handle is aborted or the runtime shuts
/// down. Purge failures are logged and the loop keeps going.
pub fn spawn_sweeper(cache: Arc<dyn QueryCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match cache.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired cache entries"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired cache entries"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;
    use crate::infrastructure::cache::{InMemoryQueryCache, InMemoryQueryCacheConfig, ManualClock};

    #[tokio::test]
    async fn test_sweeper_purges_expired_entries() {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = Arc::new(InMemoryQueryCache::with_clock(
            InMemoryQueryCacheConfig::default().with_eager_eviction(false),
            clock.clone(),
        ));

        cache.set("a", &1, Duration::from_secs(1)).await.unwrap();
        cache.set("b", &2, Duration::from_secs(600)).await.unwrap();
        clock.advance(Duration::from_secs(2));

        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(cache.purge_expired().await.unwrap(), 0);
        assert_eq!(cache.entry_count().await.unwrap(), 1);
    }
}
