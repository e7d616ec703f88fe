//! In-memory task store implementation.
//!
//! Development/test stand-in for a real key-value backend. Lock rows use
//! `tokio::time::Instant` so paused-clock tests can drive TTL expiry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::TaskStore;
use crate::domain::{Task, TaskId};
use crate::error::StoreError;

/// Lock row: an opaque marker with an optional expiry.
#[derive(Debug, Clone, Copy)]
struct LockRow {
    expires_at: Option<Instant>,
}

impl LockRow {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

struct StoreState {
    /// All task records (single source of truth).
    records: HashMap<TaskId, Task>,

    /// Ids with a non-terminal status, so `list_pending` is O(pending)
    /// instead of a full scan.
    pending: HashSet<TaskId>,

    /// Live locks, keyed by task id.
    locks: HashMap<TaskId, LockRow>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            pending: HashSet::new(),
            locks: HashMap::new(),
        }
    }

    fn put(&mut self, task: Task) {
        if task.status.is_terminal() {
            self.pending.remove(&task.id);
        } else {
            self.pending.insert(task.id);
        }
        self.records.insert(task.id, task);
    }
}

pub struct InMemoryTaskStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::new())),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_pending(&self) -> Result<Vec<TaskId>, StoreError> {
        let state = self.state.lock().await;
        let mut ids: Vec<TaskId> = state.pending.iter().copied().collect();
        // ULID order == submission order; keeps discovery deterministic.
        ids.sort();
        Ok(ids)
    }

    async fn list(&self) -> Result<Vec<TaskId>, StoreError> {
        let state = self.state.lock().await;
        let mut ids: Vec<TaskId> = state.records.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id).cloned())
    }

    async fn put(&self, task: Task) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.put(task);
        Ok(())
    }

    async fn try_lock(&self, id: TaskId, ttl: Option<Duration>) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        match state.locks.get(&id) {
            Some(row) if !row.is_expired(now) => Ok(false),
            _ => {
                let expires_at = ttl.map(|ttl| now + ttl);
                state.locks.insert(id, LockRow { expires_at });
                Ok(true)
            }
        }
    }

    async fn unlock(&self, id: TaskId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.locks.remove(&id);
        Ok(())
    }
}
