//! Per-service rollout locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Keyed lock ensuring at most one rollout per service at a time.
///
/// Entries exist only while a rollout holds or waits for them.
#[derive(Debug, Clone, Default)]
pub struct ServiceLocks {
    locks: LockTable,
}

/// Exclusive access to one service; the table entry is dropped with the
/// last holder.
#[derive(Debug)]
pub struct ServiceLockGuard {
    service_id: String,
    locks: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ServiceLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, service_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(service_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `service_id`. Released when the guard drops.
    pub async fn acquire(&self, service_id: &str) -> ServiceLockGuard {
        let guard = self.entry(service_id).lock_owned().await;
        ServiceLockGuard {
            service_id: service_id.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Check whether a rollout currently holds `service_id`
    pub fn is_locked(&self, service_id: &str) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let locked = match locks.get(service_id) {
            Some(lock) => lock.try_lock().is_err(),
            None => false,
        };
        locked
    }

    /// Number of services with a held or awaited lock
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ServiceLockGuard {
    fn drop(&mut self) {
        // Release first so the owned guard's reference is not counted.
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(&self.service_id)
            .map(|lock| Arc::strong_count(lock) == 1)
            .unwrap_or(false);
        if idle {
            locks.remove(&self.service_id);
        }
    }
}
