//! Unit-of-work listeners that apply deferred cache invalidation

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::cache::QueryCache;
use crate::domain::query::UnitOfWorkListener;
use crate::domain::DomainError;

/// Drains the cache's pending prefix removals after every commit
///
/// The flush runs on each commit, whatever the affected count. Removals
/// queued before a rollback stay pending until the next commit.
#[derive(Debug, Clone)]
pub struct FlushPendingOnCommit {
    cache: Arc<dyn QueryCache>,
}

impl FlushPendingOnCommit {
    pub fn new(cache: Arc<dyn QueryCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl UnitOfWorkListener for FlushPendingOnCommit {
    async fn committed(&self, affected: u64) -> Result<(), DomainError> {
        let removed = self.cache.flush_pending_removals().await?;

        tracing::debug!(affected, removed, "Applied pending cache removals after commit");
        Ok(())
    }
}

/// Listeners the unit of work notifies at its boundaries
///
/// A failing listener is logged and the remaining listeners still run.
#[derive(Default, Clone)]
pub struct UnitOfWorkHooks {
    listeners: Vec<Arc<dyn UnitOfWorkListener>>,
}

impl std::fmt::Debug for UnitOfWorkHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWorkHooks")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl UnitOfWorkHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn UnitOfWorkListener>) {
        self.listeners.push(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn UnitOfWorkListener>) -> Self {
        self.register(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notifies every listener of a commit; returns how many failed
    pub async fn notify_committed(&self, affected: u64) -> usize {
        let mut failures = 0;

        for listener in &self.listeners {
            if let Err(e) = listener.committed(affected).await {
                tracing::warn!(error = %e, affected, "Unit-of-work commit listener failed");
                failures += 1;
            }
        }

        failures
    }

    /// Notifies every listener of a rollback; returns how many failed
    pub async fn notify_rolled_back(&self) -> usize {
        let mut failures = 0;

        for listener in &self.listeners {
            if let Err(e) = listener.rolled_back().await {
                tracing::warn!(error = %e, "Unit-of-work rollback listener failed");
                failures += 1;
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::cache::CacheExt;
    use crate::domain::query::{Command, DbValue, MockUnitOfWorkListener, QueryExecutor};
    use crate::infrastructure::cache::InMemoryQueryCache;
    use crate::infrastructure::executor::InMemoryQueryExecutor;
    use crate::infrastructure::interceptor::CachingExecutor;

    #[tokio::test]
    async fn test_commit_flushes_pending_removals() {
        let cache: Arc<dyn QueryCache> = Arc::new(InMemoryQueryCache::new());
        cache.set("user:1", &"Ann", Duration::from_secs(10)).await.unwrap();
        cache.add_pending_removal("user:").await.unwrap();

        let listener = FlushPendingOnCommit::new(cache.clone());
        listener.rolled_back().await.unwrap();
        assert!(cache.exists("user:1").await.unwrap());

        listener.committed(0).await.unwrap();
        assert!(!cache.exists("user:1").await.unwrap());
        assert!(cache.pending_removals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_removal_serves_cached_result_until_commit() {
        let sql = "SELECT Name FROM Users WHERE Id = 1";
        let cache: Arc<dyn QueryCache> = Arc::new(InMemoryQueryCache::new());
        let executor = CachingExecutor::new(
            InMemoryQueryExecutor::new().with_scalar(sql, DbValue::from("Ann")),
            cache.clone(),
        );
        let hooks =
            UnitOfWorkHooks::new().with_listener(Arc::new(FlushPendingOnCommit::new(cache.clone())));
        let command = Command::new(sql).cacheable("user:1", Duration::from_secs(10));

        executor.execute_scalar(&command).await.unwrap();
        cache.add_pending_removal("user:").await.unwrap();

        executor.execute_scalar(&command).await.unwrap();
        assert_eq!(executor.inner().call_count(), 1);

        assert_eq!(hooks.notify_committed(1).await, 0);

        executor.execute_scalar(&command).await.unwrap();
        assert_eq!(executor.inner().call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_stop_others() {
        let mut failing = MockUnitOfWorkListener::new();
        failing
            .expect_committed()
            .times(1)
            .returning(|_| Err(DomainError::cache("store offline")));

        let mut ok = MockUnitOfWorkListener::new();
        ok.expect_committed().times(1).returning(|_| Ok(()));

        let mut hooks = UnitOfWorkHooks::new();
        hooks.register(Arc::new(failing));
        hooks.register(Arc::new(ok));

        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks.notify_committed(3).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_keeps_pending_removals() {
        let cache: Arc<dyn QueryCache> = Arc::new(InMemoryQueryCache::new());
        let hooks =
            UnitOfWorkHooks::new().with_listener(Arc::new(FlushPendingOnCommit::new(cache.clone())));

        cache.add_pending_removal("blogs:").await.unwrap();

        assert_eq!(hooks.notify_rolled_back().await, 0);
        assert_eq!(cache.pending_removals().await.unwrap(), vec!["blogs:".to_string()]);
    }
}
