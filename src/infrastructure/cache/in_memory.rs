//! In-memory expiring cache using moka

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::sync::Cache as MokaCache;
use moka::Expiry;

use super::clock::{Clock, SystemClock};
use crate::domain::cache::QueryCache;
use crate::domain::DomainError;
use crate::infrastructure::observability::metrics;

/// Configuration for the in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryQueryCacheConfig {
    /// Let moka evict entries when their TTL elapses, in addition to the
    /// expiration check made on every read
    pub eager_eviction: bool,
    /// Initial capacity hint for the entry table
    pub initial_capacity: usize,
}

impl Default for InMemoryQueryCacheConfig {
    fn default() -> Self {
        Self {
            eager_eviction: true,
            initial_capacity: 1_024,
        }
    }
}

impl InMemoryQueryCacheConfig {
    /// Sets whether moka evicts expired entries on its own
    pub fn with_eager_eviction(mut self, enabled: bool) -> Self {
        self.eager_eviction = enabled;
        self
    }

    /// Sets the initial capacity hint
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Serialized JSON value
    data: Arc<str>,
    expires_at: DateTime<Utc>,
    ttl: Duration,
}

/// Per-entry expiry policy: every entry lives for its own TTL
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe in-memory query cache
///
/// - absolute per-entry expiration, checked against the injected [`Clock`] on
///   every read, so an expired value is never served
/// - an ordered index of known keys for prefix removal
/// - a queue of pending prefix removals drained by
///   [`QueryCache::flush_pending_removals`]
///
/// Writes to the entry table and the key index happen together under the
/// index lock, so a prefix scan never misses a concurrently inserted key.
#[derive(Debug)]
pub struct InMemoryQueryCache {
    entries: MokaCache<String, CacheEntry>,
    keys: Mutex<BTreeSet<String>>,
    pending: Mutex<Vec<String>>,
    clock: Arc<dyn Clock>,
    config: InMemoryQueryCacheConfig,
}

impl InMemoryQueryCache {
    /// Creates a new in-memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryQueryCacheConfig::default())
    }

    /// Creates a new in-memory cache with the given configuration
    pub fn with_config(config: InMemoryQueryCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from `clock`
    pub fn with_clock(config: InMemoryQueryCacheConfig, clock: Arc<dyn Clock>) -> Self {
        let mut builder = MokaCache::builder().initial_capacity(config.initial_capacity);

        if config.eager_eviction {
            builder = builder.expire_after(EntryExpiry);
        }

        Self {
            entries: builder.build(),
            keys: Mutex::new(BTreeSet::new()),
            pending: Mutex::new(Vec::new()),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &InMemoryQueryCacheConfig {
        &self.config
    }

    fn keys(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pending(&self) -> MutexGuard<'_, Vec<String>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.clock.now() >= entry.expires_at
    }

    fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).filter(|entry| !self.is_expired(entry))
    }

    /// Drops `key` if it is still expired once the index lock is held
    fn evict_if_expired(&self, key: &str) {
        let mut keys = self.keys();

        if let Some(entry) = self.entries.get(key) {
            if self.is_expired(&entry) {
                self.entries.invalidate(key);
                keys.remove(key);
            }
        }
    }

    /// Drops `key` from the index once moka no longer holds it
    fn forget_if_evicted(&self, key: &str) {
        let mut keys = self.keys();

        if keys.contains(key) && self.entries.get(key).is_none() {
            keys.remove(key);
        }
    }

    fn remove_prefix(&self, prefix: &str) -> usize {
        let mut keys = self.keys();

        let matching: Vec<String> = keys
            .range(prefix.to_string()..)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        let mut removed = 0;

        for key in matching {
            keys.remove(&key);

            if let Some(entry) = self.entries.remove(&key) {
                if !self.is_expired(&entry) {
                    removed += 1;
                }
            }
        }

        removed
    }
}

impl Default for InMemoryQueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryCache for InMemoryQueryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        match self.entries.get(key) {
            Some(entry) => {
                if self.is_expired(&entry) {
                    self.evict_if_expired(key);
                    tracing::debug!(key = %key, "Cache entry expired");
                    return Ok(None);
                }

                tracing::debug!(key = %key, "Requesting from cache");
                Ok(Some(entry.data.to_string()))
            }
            None => {
                self.forget_if_evicted(key);
                tracing::debug!(key = %key, "Not cached yet");
                Ok(None)
            }
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = CacheEntry {
            data: Arc::from(value),
            expires_at: self.clock.expires_at(ttl),
            ttl,
        };

        {
            let mut keys = self.keys();
            keys.insert(key.to_string());
            self.entries.insert(key.to_string(), entry);
        }

        tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Setting cache");
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<bool, DomainError> {
        let removed = {
            let mut keys = self.keys();
            keys.remove(key);
            self.entries.remove(key)
        };

        Ok(removed.is_some_and(|entry| !self.is_expired(&entry)))
    }

    async fn remove_keys_with_prefix(&self, prefix: &str) -> Result<usize, DomainError> {
        let removed = self.remove_prefix(prefix);

        tracing::info!(prefix = %prefix, removed, "Removed cache keys by prefix");
        metrics::record_invalidation(removed, false);
        Ok(removed)
    }

    async fn add_pending_removal(&self, prefix: &str) -> Result<(), DomainError> {
        self.pending().push(prefix.to_string());

        tracing::info!(prefix = %prefix, "Queued pending cache removal");
        Ok(())
    }

    async fn flush_pending_removals(&self) -> Result<usize, DomainError> {
        let pending = std::mem::take(&mut *self.pending());

        if pending.is_empty() {
            return Ok(0);
        }

        let removed: usize = pending.iter().map(|prefix| self.remove_prefix(prefix)).sum();

        tracing::info!(
            prefixes = pending.len(),
            removed,
            "Flushed pending cache removals"
        );
        metrics::record_invalidation(removed, true);
        Ok(removed)
    }

    async fn pending_removals(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.pending().clone())
    }

    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let mut keys = self.keys();
        let before = keys.len();

        keys.retain(|key| match self.entries.get(key) {
            Some(entry) if self.is_expired(&entry) => {
                self.entries.invalidate(key);
                false
            }
            Some(_) => true,
            // Already evicted by moka
            None => false,
        });

        let purged = before - keys.len();
        drop(keys);

        self.entries.run_pending_tasks();
        Ok(purged)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut keys = self.keys();
        keys.clear();
        self.entries.invalidate_all();
        Ok(())
    }

    async fn entry_count(&self) -> Result<usize, DomainError> {
        let keys = self.keys();
        Ok(keys.iter().filter(|key| self.live_entry(key).is_some()).count())
    }
}
