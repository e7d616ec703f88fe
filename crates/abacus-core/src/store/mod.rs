//! Task store port: the shared coordination medium.
//!
//! The store is the only shared mutable resource between agents. Everything
//! else (lanes, the in-flight hint) is process-local. The backing technology
//! is a collaborator, not core; this trait is the seam for swapping it.

mod memory;

pub use memory::InMemoryTaskStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Task, TaskId};
use crate::error::StoreError;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Ids of tasks whose status is not terminal. Implementations should
    /// answer from an index rather than scanning every record.
    async fn list_pending(&self) -> Result<Vec<TaskId>, StoreError>;

    /// Every stored id. Retrieval-path only; the poller never calls this.
    async fn list(&self) -> Result<Vec<TaskId>, StoreError>;

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Full overwrite, used for both creation and status/result updates.
    /// Only the worker holding the task's lock may update a task.
    async fn put(&self, task: Task) -> Result<(), StoreError>;

    /// Atomic acquire-if-absent. An expired TTL lock counts as absent.
    /// `None` means the lock never goes stale on its own.
    async fn try_lock(&self, id: TaskId, ttl: Option<Duration>) -> Result<bool, StoreError>;

    /// Remove the lock unconditionally.
    async fn unlock(&self, id: TaskId) -> Result<(), StoreError>;
}
