//! Cache infrastructure - in-memory expiring store

mod clock;
mod in_memory;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use in_memory::{InMemoryQueryCache, InMemoryQueryCacheConfig};
pub use sweeper::spawn_sweeper;
