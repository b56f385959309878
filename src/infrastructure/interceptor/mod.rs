//! Query interception - serves annotated commands from the cache

mod coordinator;
mod key_lock;
mod tabular;
mod unit_of_work;

pub use coordinator::CachingExecutor;
pub use key_lock::{KeyGuard, KeyedLocks};
pub use tabular::{
    capture_affected, capture_rows, capture_scalar, replay_affected, replay_rows, replay_scalar,
    ReplayCursor,
};
pub use unit_of_work::{FlushPendingOnCommit, UnitOfWorkHooks};
