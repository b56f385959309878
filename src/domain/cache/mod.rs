//! Cache domain - expiring key-value store abstraction

mod key;
mod repository;

pub use key::{CacheKeyBuilder, DEFAULT_SEPARATOR};
pub use repository::{CacheExt, QueryCache};

#[cfg(test)]
pub use repository::mock::MockQueryCache;
