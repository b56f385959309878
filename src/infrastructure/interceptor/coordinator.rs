//! Query executor decorator serving tagged commands from the cache

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use super::key_lock::KeyedLocks;
use super::tabular::{
    capture_affected, capture_rows, capture_scalar, replay_affected, replay_rows, replay_scalar,
};
use crate::domain::cache::{CacheExt, QueryCache};
use crate::domain::query::{CachedResult, Command, DbValue, QueryExecutor, ResultShape, RowCursor};
use crate::domain::DomainError;
use crate::infrastructure::observability::metrics;

/// Executor wrapper that answers annotated commands from a [`QueryCache`]
///
/// Commands without a cache annotation go straight to the inner executor.
/// For annotated commands the stored result is replayed when present;
/// otherwise the inner executor runs (without any lock held), its result is
/// captured and stored under the effective key, and a replay of the capture
/// is returned. Misses therefore always hand back a replayed cursor.
///
/// Concurrent first executions of one key may each reach the inner executor;
/// the last store wins and the store keeps a single entry.
pub struct CachingExecutor<X: QueryExecutor> {
    inner: X,
    cache: Arc<dyn QueryCache>,
    locks: KeyedLocks,
}

impl<X: QueryExecutor> fmt::Debug for CachingExecutor<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingExecutor")
            .field("cache", &self.cache)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl<X: QueryExecutor> CachingExecutor<X> {
    pub fn new(inner: X, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            inner,
            cache,
            locks: KeyedLocks::new(),
        }
    }

    pub fn inner(&self) -> &X {
        &self.inner
    }

    pub fn cache(&self) -> &Arc<dyn QueryCache> {
        &self.cache
    }

    async fn lookup(&self, key: &str) -> Option<CachedResult> {
        let _guard = self.locks.lock(key).await;
        self.cache.try_get::<CachedResult>(key).await
    }

    async fn store(&self, key: &str, ttl: Duration, result: &CachedResult) {
        let shape = result.shape();
        let stored = {
            let _guard = self.locks.lock(key).await;
            self.cache.set(key, result, ttl).await
        };

        match stored {
            Ok(()) => {
                tracing::debug!(key = %key, shape = %shape, "Stored query result in cache");
                metrics::record_cache_store(shape, true);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to store query result, dropping");
                metrics::record_cache_store(shape, false);
            }
        }
    }

    /// Returns the stored result for `key` or runs `execute` and stores its capture
    #[instrument(level = "debug", skip(self, ttl, shape, execute), fields(shape = %shape))]
    async fn resolve<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        shape: ResultShape,
        execute: F,
    ) -> Result<CachedResult, DomainError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<CachedResult, DomainError>> + Send,
    {
        if let Some(cached) = self.lookup(key).await {
            tracing::debug!(key = %key, shape = %shape, "Query cache hit");
            metrics::record_cache_hit(shape);
            return Ok(cached);
        }

        tracing::debug!(key = %key, shape = %shape, "Query cache miss");
        metrics::record_cache_miss(shape);

        let captured = execute().await?;
        self.store(key, ttl, &captured).await;

        Ok(captured)
    }
}

fn log_mismatch(key: &str) -> impl FnOnce(&DomainError) + '_ {
    move |e| tracing::error!(key = %key, error = %e, "Cached result has the wrong shape")
}

#[async_trait]
impl<X: QueryExecutor> QueryExecutor for CachingExecutor<X> {
    async fn execute_reader(&self, command: &Command) -> Result<Box<dyn RowCursor>, DomainError> {
        let Some(params) = command.cache_parameters() else {
            metrics::record_cache_bypass();
            return self.inner.execute_reader(command).await;
        };

        let key = params.effective_key();
        let result = self
            .resolve(&key, params.ttl, ResultShape::Rows, || async {
                capture_rows(self.inner.execute_reader(command).await?).await
            })
            .await?;

        replay_rows(&key, result).inspect_err(log_mismatch(&key))
    }

    async fn execute_scalar(&self, command: &Command) -> Result<DbValue, DomainError> {
        let Some(params) = command.cache_parameters() else {
            metrics::record_cache_bypass();
            return self.inner.execute_scalar(command).await;
        };

        let key = params.effective_key();
        let result = self
            .resolve(&key, params.ttl, ResultShape::Scalar, || async {
                self.inner.execute_scalar(command).await.map(capture_scalar)
            })
            .await?;

        replay_scalar(&key, result).inspect_err(log_mismatch(&key))
    }

    async fn execute_non_query(&self, command: &Command) -> Result<u64, DomainError> {
        let Some(params) = command.cache_parameters() else {
            metrics::record_cache_bypass();
            return self.inner.execute_non_query(command).await;
        };

        let key = params.effective_key();
        let result = self
            .resolve(&key, params.ttl, ResultShape::AffectedRows, || async {
                self.inner.execute_non_query(command).await.map(capture_affected)
            })
            .await?;

        replay_affected(&key, result).inspect_err(log_mismatch(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockQueryCache;
    use crate::domain::query::{ColumnInfo, MockQueryExecutor, TableRow, TableRows};
    use crate::infrastructure::cache::InMemoryQueryCache;
    use crate::infrastructure::executor::InMemoryQueryExecutor;
    use crate::infrastructure::interceptor::ReplayCursor;

    const BLOGS_SQL: &str = "SELECT Id, Name FROM Blogs";

    /// Collects the names of spans opened while installed
    struct SpanNames(Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanNames {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().unwrap().push(attrs.metadata().name().to_string());
        }
    }

    fn blogs() -> TableRows {
        TableRows::new(vec![
            ColumnInfo::new(0, "Id", "int", "int"),
            ColumnInfo::new(1, "Name", "nvarchar", "text"),
        ])
        .with_rows(vec![
            TableRow::new(vec![DbValue::Int(1), DbValue::from("first")]),
            TableRow::new(vec![DbValue::Int(2), DbValue::Null]),
        ])
    }

    fn tagged(key: &str) -> Command {
        Command::new(BLOGS_SQL).cacheable(key, Duration::from_secs(60))
    }

    async fn read_all(mut cursor: Box<dyn RowCursor>) -> Vec<Vec<DbValue>> {
        let mut rows = Vec::new();
        while cursor.advance().await.unwrap() {
            rows.push(cursor.current_values().unwrap());
        }
        cursor.close().await.unwrap();
        rows
    }

    #[tokio::test]
    async fn test_second_execution_is_served_from_cache() {
        let mut inner = MockQueryExecutor::new();
        inner
            .expect_execute_reader()
            .times(1)
            .returning(|_| Ok(Box::new(ReplayCursor::new(blogs())) as Box<dyn RowCursor>));

        let cache: Arc<dyn QueryCache> = Arc::new(InMemoryQueryCache::new());
        let executor = CachingExecutor::new(inner, cache.clone());

        let first = read_all(executor.execute_reader(&tagged("blogs:")).await.unwrap()).await;
        let second = read_all(executor.execute_reader(&tagged("blogs:")).await.unwrap()).await;

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(second[1][1].is_null());
        assert!(cache.exists("blogs:").await.unwrap());
    }

    #[tokio::test]
    async fn test_hit_replays_column_schema() {
        let inner = InMemoryQueryExecutor::new().with_rows(BLOGS_SQL, blogs());
        let executor = CachingExecutor::new(inner, Arc::new(InMemoryQueryCache::new()));

        executor.execute_reader(&tagged("blogs:")).await.unwrap();
        let mut cursor = executor.execute_reader(&tagged("blogs:")).await.unwrap();

        assert_eq!(cursor.columns(), blogs().columns.as_slice());
        assert!(cursor.advance().await.unwrap());
        assert_eq!(cursor.get_by_name("name").unwrap(), &DbValue::from("first"));
        assert_eq!(executor.inner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_tagged_execution_runs_inside_span() {
        use tracing_subscriber::layer::SubscriberExt;

        let names = Arc::new(std::sync::Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(SpanNames(names.clone()));
        let _default = tracing::subscriber::set_default(subscriber);

        let mut inner = MockQueryExecutor::new();
        inner
            .expect_execute_scalar()
            .times(1)
            .returning(|_| Ok(DbValue::Int(1)));

        let executor = CachingExecutor::new(inner, Arc::new(InMemoryQueryCache::new()));
        let command = Command::new("SELECT 1").cacheable("one", Duration::from_secs(60));
        executor.execute_scalar(&command).await.unwrap();

        assert!(names.lock().unwrap().iter().any(|name| name == "resolve"));
    }

    #[tokio::test]
    async fn test_untagged_command_bypasses_cache() {
        let mut inner = MockQueryExecutor::new();
        inner
            .expect_execute_scalar()
            .times(2)
            .returning(|_| Ok(DbValue::Int(42)));

        let cache = Arc::new(InMemoryQueryCache::new());
        let executor = CachingExecutor::new(inner, cache.clone());
        let command = Command::new("SELECT COUNT(*) FROM Blogs");

        assert_eq!(executor.execute_scalar(&command).await.unwrap(), DbValue::Int(42));
        assert_eq!(executor.execute_scalar(&command).await.unwrap(), DbValue::Int(42));
        assert_eq!(cache.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scalar_and_non_query_are_cached() {
        let mut inner = MockQueryExecutor::new();
        inner
            .expect_execute_scalar()
            .times(1)
            .returning(|_| Ok(DbValue::Null));
        inner
            .expect_execute_non_query()
            .times(1)
            .returning(|_| Ok(3));

        let executor = CachingExecutor::new(inner, Arc::new(InMemoryQueryCache::new()));
        let scalar = Command::new("SELECT MAX(Id) FROM Blogs").cacheable("blogs:max", Duration::from_secs(60));
        let update = Command::new("UPDATE Blogs SET Name = ''").cacheable("blogs:touch", Duration::from_secs(60));

        for _ in 0..2 {
            assert_eq!(executor.execute_scalar(&scalar).await.unwrap(), DbValue::Null);
            assert_eq!(executor.execute_non_query(&update).await.unwrap(), 3);
        }
    }

    #[tokio::test]
    async fn test_executor_error_propagates_and_stores_nothing() {
        let mut inner = MockQueryExecutor::new();
        inner
            .expect_execute_scalar()
            .times(1)
            .returning(|_| Err(DomainError::execution("deadlock victim")));

        let cache = Arc::new(InMemoryQueryCache::new());
        let executor = CachingExecutor::new(inner, cache.clone());
        let command = Command::new("SELECT 1").cacheable("one", Duration::from_secs(60));

        let result = executor.execute_scalar(&command).await;

        match result {
            Err(DomainError::Execution { message }) => assert_eq!(message, "deadlock victim"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(cache.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shape_mismatch_fails_loudly() {
        let cache: Arc<dyn QueryCache> = Arc::new(InMemoryQueryCache::new());
        cache
            .set("blogs:", &CachedResult::AffectedRows(5), Duration::from_secs(60))
            .await
            .unwrap();

        let mut inner = MockQueryExecutor::new();
        inner.expect_execute_scalar().never();

        let executor = CachingExecutor::new(inner, cache);
        let command = Command::new("SELECT 1").cacheable("blogs:", Duration::from_secs(60));

        let result = executor.execute_scalar(&command).await;
        assert!(matches!(result, Err(DomainError::ShapeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_cache_failures_degrade_to_miss() {
        let mut inner = MockQueryExecutor::new();
        inner
            .expect_execute_scalar()
            .times(2)
            .returning(|_| Ok(DbValue::Int(7)));

        let cache = Arc::new(MockQueryCache::new().with_error("store offline"));
        let executor = CachingExecutor::new(inner, cache);
        let command = Command::new("SELECT 7").cacheable("seven", Duration::from_secs(60));

        assert_eq!(executor.execute_scalar(&command).await.unwrap(), DbValue::Int(7));
        assert_eq!(executor.execute_scalar(&command).await.unwrap(), DbValue::Int(7));
    }

    #[tokio::test]
    async fn test_undecodable_entry_reads_as_miss() {
        let cache = Arc::new(MockQueryCache::new().with_raw_entry("seven", "not json"));

        let mut inner = MockQueryExecutor::new();
        inner
            .expect_execute_scalar()
            .times(1)
            .returning(|_| Ok(DbValue::Int(7)));

        let executor = CachingExecutor::new(inner, cache.clone());
        let command = Command::new("SELECT 7").cacheable("seven", Duration::from_secs(60));

        assert_eq!(executor.execute_scalar(&command).await.unwrap(), DbValue::Int(7));

        let stored: Option<CachedResult> = cache.get("seven").await.unwrap();
        assert_eq!(stored, Some(CachedResult::Scalar(DbValue::Int(7))));
    }

    #[tokio::test]
    async fn test_modifiers_get_separate_entries() {
        let inner = InMemoryQueryExecutor::new()
            .with_rows(BLOGS_SQL, blogs())
            .with_scalar(BLOGS_SQL, DbValue::Int(2));
        let cache = Arc::new(InMemoryQueryCache::new());
        let executor = CachingExecutor::new(inner, cache.clone());

        let list = tagged("blogs:").with_modifier("list");
        let count = tagged("blogs:").with_modifier("count");

        executor.execute_reader(&list).await.unwrap();
        assert_eq!(executor.execute_scalar(&count).await.unwrap(), DbValue::Int(2));

        assert!(cache.exists("blogs:list").await.unwrap());
        assert!(cache.exists("blogs:count").await.unwrap());
        assert_eq!(executor.inner().call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_executions_store_one_entry() {
        let inner = InMemoryQueryExecutor::new()
            .with_rows(BLOGS_SQL, blogs())
            .with_delay(Duration::from_millis(20));
        let cache = Arc::new(InMemoryQueryCache::new());
        let executor = Arc::new(CachingExecutor::new(inner, cache.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            handles.push(tokio::spawn(async move {
                let cursor = executor.execute_reader(&tagged("blogs:")).await.unwrap();
                read_all(cursor).await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().len(), 2);
        }

        let calls = executor.inner().call_count();
        assert!((1..=8).contains(&calls));
        assert_eq!(cache.entry_count().await.unwrap(), 1);

        executor.execute_reader(&tagged("blogs:")).await.unwrap();
        assert_eq!(executor.inner().call_count(), calls);
    }

    #[tokio::test]
    async fn test_cancelled_execution_stores_nothing() {
        let inner = InMemoryQueryExecutor::new()
            .with_scalar("SELECT 1", DbValue::Int(1))
            .with_delay(Duration::from_millis(200));
        let cache = Arc::new(InMemoryQueryCache::new());
        let executor = Arc::new(CachingExecutor::new(inner, cache.clone()));

        let task = {
            let executor = executor.clone();
            tokio::spawn(async move {
                let command = Command::new("SELECT 1").cacheable("one", Duration::from_secs(60));
                executor.execute_scalar(&command).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert_eq!(cache.entry_count().await.unwrap(), 0);
        assert_eq!(executor.locks.len(), 0);
    }
}
