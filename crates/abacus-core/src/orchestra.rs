//! Submission and retrieval facade over the task store.
//!
//! An HTTP front-end (not part of this crate) is a thin client of this
//! type; identity scoping for retrieval is equally a caller concern.

use std::sync::Arc;

use regex::Regex;
use tracing::info;

use crate::domain::{Clock, SystemClock, Task, TaskId, TaskIdGenerator};
use crate::error::{StoreError, SubmitError};
use crate::observability::TaskCounts;
use crate::store::TaskStore;

/// Characters a raw expression may contain. Anything else is rejected
/// before a task is ever created.
const ALLOWED_EXPRESSION: &str = r"^[0-9+\-*/.\s]+$";

pub struct Orchestrator<C: Clock = SystemClock> {
    store: Arc<dyn TaskStore>,
    clock: C,
    ids: TaskIdGenerator<C>,
    allowed: Regex,
}

impl Orchestrator<SystemClock> {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<C: Clock + Clone> Orchestrator<C> {
    pub fn with_clock(store: Arc<dyn TaskStore>, clock: C) -> Self {
        Self {
            store,
            ids: TaskIdGenerator::new(clock.clone()),
            clock,
            allowed: Regex::new(ALLOWED_EXPRESSION).expect("hard-coded pattern compiles"),
        }
    }

    /// Validate, assign a fresh id, persist as pending.
    ///
    /// No dedup by content: the same expression submitted twice becomes
    /// two tasks. Ids are never reused.
    pub async fn submit(&self, expression: &str) -> Result<TaskId, SubmitError> {
        if !self.allowed.is_match(expression) {
            return Err(SubmitError::InvalidExpression);
        }

        let id = self.ids.generate();
        let mut task = Task::new_pending(id, expression);
        task.started_at = Some(self.clock.now());
        self.store.put(task).await?;

        info!(task_id = %id, expression, "task submitted");
        Ok(id)
    }

    /// Every stored task.
    pub async fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks = Vec::new();
        for id in self.store.list().await? {
            if let Some(task) = self.store.get(id).await? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    pub async fn task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.store.get(id).await
    }

    /// Status totals for a quick health read.
    pub async fn counts(&self) -> Result<TaskCounts, StoreError> {
        use crate::domain::TaskStatus;

        let mut counts = TaskCounts::default();
        for task in self.tasks().await? {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Error => counts.error += 1,
            }
        }
        Ok(counts)
    }
}
