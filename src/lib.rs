//! Query Result Cache
//!
//! Caches database query results behind a query executor:
//! - cache hints carried as SQL comment annotations
//! - an in-memory expiring store with prefix and deferred invalidation
//! - capture and replay of row sets, scalars and affected-row counts
//! - per-key locking around cache lookups and stores
//! - flushing of deferred invalidations after a unit of work commits

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    CacheExt, CacheKeyBuilder, CacheParameters, CachedResult, Command, DbValue, DomainError,
    QueryCache, QueryExecutor, RowCursor,
};
pub use infrastructure::cache::InMemoryQueryCache;
pub use infrastructure::interceptor::{CachingExecutor, FlushPendingOnCommit, UnitOfWorkHooks};
