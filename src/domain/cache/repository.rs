//! Query cache trait definition

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Expiring key-value store with prefix invalidation and deferred removals
///
/// Values are stored as JSON text so the trait stays dyn-compatible; the
/// typed helpers live on [`CacheExt`]. The in-memory implementation never
/// fails, but the signatures allow an external backend to report errors.
#[async_trait]
pub trait QueryCache: Send + Sync + Debug {
    /// Gets a raw JSON value, `None` if never set or already expired
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Inserts or overwrites a raw JSON value that expires `ttl` from now
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Removes a single key, returns whether a live entry was removed
    async fn remove_key(&self, key: &str) -> Result<bool, DomainError>;

    /// Removes every known key starting with `prefix`
    async fn remove_keys_with_prefix(&self, prefix: &str) -> Result<usize, DomainError>;

    /// Queues a prefix removal until [`QueryCache::flush_pending_removals`] runs
    async fn add_pending_removal(&self, prefix: &str) -> Result<(), DomainError>;

    /// Drains the pending queue, removing keys for every queued prefix
    async fn flush_pending_removals(&self) -> Result<usize, DomainError>;

    /// Prefixes currently waiting for a flush
    async fn pending_removals(&self) -> Result<Vec<String>, DomainError>;

    /// Checks whether a live entry exists
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Drops expired entries eagerly, returns how many were dropped
    async fn purge_expired(&self) -> Result<usize, DomainError>;

    /// Removes every entry. Pending removals are kept.
    async fn clear(&self) -> Result<(), DomainError>;

    /// Number of live entries
    async fn entry_count(&self) -> Result<usize, DomainError>;
}

/// Extension trait providing typed operations over any [`QueryCache`]
pub trait CacheExt: QueryCache {
    /// Gets a typed value, propagating store and decoding errors
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl Future<Output = Result<Option<V>, DomainError>> + Send + 'a
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::cache(format!("Failed to deserialize cache value: {}", e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Gets a typed value; any failure reads as a miss
    fn try_get<'a, V>(&'a self, key: &'a str) -> impl Future<Output = Option<V>> + Send + 'a
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get::<V>(key).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                    None
                }
            }
        }
    }

    /// Sets a typed value with an absolute expiration relative to now
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), DomainError>> + Send + 'a
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }

    /// Returns the cached value or builds it with `factory` and caches it
    ///
    /// Values serializing to `null` are returned but not cached.
    fn get_or_create<'a, V, F>(
        &'a self,
        key: &'a str,
        factory: F,
        ttl: Duration,
    ) -> impl Future<Output = Result<V, DomainError>> + Send + 'a
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'a,
        F: FnOnce() -> V + Send + 'a,
    {
        async move {
            if let Some(value) = self.get::<V>(key).await? {
                return Ok(value);
            }

            let value = factory();
            store_unless_null(self, key, &value, ttl).await?;
            Ok(value)
        }
    }

    /// Async variant of [`CacheExt::get_or_create`]; factory errors are returned as-is
    fn get_or_create_async<'a, V, F, Fut>(
        &'a self,
        key: &'a str,
        factory: F,
        ttl: Duration,
    ) -> impl Future<Output = Result<V, DomainError>> + Send + 'a
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'a,
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'a,
    {
        async move {
            if let Some(value) = self.get::<V>(key).await? {
                return Ok(value);
            }

            let value = factory().await?;
            store_unless_null(self, key, &value, ttl).await?;
            Ok(value)
        }
    }

    /// Runs `action` with the cached value if one exists, returns whether it ran
    fn if_exists_do<'a, V, F>(
        &'a self,
        key: &'a str,
        action: F,
    ) -> impl Future<Output = Result<bool, DomainError>> + Send + 'a
    where
        V: DeserializeOwned + Send + 'a,
        F: FnOnce(V) + Send + 'a,
    {
        async move {
            match self.get::<V>(key).await? {
                Some(value) => {
                    action(value);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    /// Async variant of [`CacheExt::if_exists_do`]
    fn if_exists_do_async<'a, V, F, Fut>(
        &'a self,
        key: &'a str,
        action: F,
    ) -> impl Future<Output = Result<bool, DomainError>> + Send + 'a
    where
        V: DeserializeOwned + Send + 'a,
        F: FnOnce(V) -> Fut + Send + 'a,
        Fut: Future<Output = ()> + Send + 'a,
    {
        async move {
            match self.get::<V>(key).await? {
                Some(value) => {
                    action(value).await;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }
}

// Blanket implementation for all types implementing QueryCache
impl<T: QueryCache + ?Sized> CacheExt for T {}

async fn store_unless_null<C, V>(
    cache: &C,
    key: &str,
    value: &V,
    ttl: Duration,
) -> Result<(), DomainError>
where
    C: QueryCache + ?Sized,
    V: Serialize + Send + Sync,
{
    let data = serde_json::to_string(value)
        .map_err(|e| DomainError::cache(format!("Failed to serialize cache value: {}", e)))?;

    if data == "null" {
        return Ok(());
    }

    cache.set_raw(key, &data, ttl).await
}
