//! Per-key async locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<String, Slot>>>;

/// One key's mutex and the number of tasks holding or awaiting it
#[derive(Debug, Default)]
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    users: usize,
}

/// Async mutual exclusion scoped to a cache key
///
/// Locks are created on first use and dropped once no task holds or waits
/// on them, so unrelated keys never contend.
#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    locks: LockMap,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            let slot = locks.entry(key.to_string()).or_default();
            slot.users += 1;
            slot.mutex.clone()
        };

        let registration = Registration {
            key: key.to_string(),
            locks: self.locks.clone(),
        };

        // Cancelled here, `registration` still prunes the entry on drop
        let guard = mutex.lock_owned().await;

        KeyGuard {
            guard: Some(guard),
            registration,
        }
    }

    /// Number of keys currently locked or awaited
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A task's claim on a map entry, held while waiting and while locked
#[derive(Debug)]
struct Registration {
    key: String,
    locks: LockMap,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(slot) = locks.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                locks.remove(&self.key);
            }
        }
    }
}

/// Exclusive access to one key, released on drop
#[derive(Debug)]
pub struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    registration: Registration,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.registration.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Unlock before the slot can be removed
        drop(self.guard.take());
    }
}
