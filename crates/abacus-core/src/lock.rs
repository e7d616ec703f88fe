//! Distributed mutual exclusion over the task store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::domain::TaskId;
use crate::error::StoreError;
use crate::store::TaskStore;

/// Wraps the store's acquire-if-absent primitive with acquire/release
/// semantics and a staleness bound.
///
/// `in_flight` is a local fast-path hint only: it lets a worker skip the
/// store round-trip for a task a sibling worker in this process already
/// holds. It is never authoritative across agents; the store lock is.
pub struct LockManager {
    store: Arc<dyn TaskStore>,
    ttl: Option<Duration>,
    in_flight: Mutex<HashSet<TaskId>>,
}

impl LockManager {
    pub fn new(store: Arc<dyn TaskStore>, ttl: Option<Duration>) -> Self {
        Self {
            store,
            ttl,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Try to take the task's lock. `false` means someone else holds it;
    /// the caller abandons this task instance without error and the task
    /// is rediscovered on a later poll.
    pub async fn try_acquire(&self, id: TaskId) -> Result<bool, StoreError> {
        if self.in_flight.lock().await.contains(&id) {
            return Ok(false);
        }
        if !self.store.try_lock(id, self.ttl).await? {
            return Ok(false);
        }
        self.in_flight.lock().await.insert(id);
        Ok(true)
    }

    /// Release the lock. The local hint is cleared first so a store
    /// failure cannot wedge this process; the store row then leaks until
    /// its TTL expires (or indefinitely without one).
    pub async fn release(&self, id: TaskId) -> Result<(), StoreError> {
        self.in_flight.lock().await.remove(&id);
        self.store.unlock(id).await
    }
}
