//! Task record and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskId;

/// Stored task status.
///
/// There is deliberately no `processing` variant: lock presence is the
/// authoritative in-flight signal, so status and lock cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Error,
}

impl TaskStatus {
    /// Terminal statuses are skipped by the poller and never leave again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

/// One arithmetic expression to evaluate.
///
/// Created by the submission path, mutated only by the worker holding the
/// task's lock, never deleted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub expression: String,
    pub status: TaskStatus,
    /// Meaningful only when `status` is `completed`.
    pub result: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new_pending(id: TaskId, expression: impl Into<String>) -> Self {
        Self {
            id,
            expression: expression.into(),
            status: TaskStatus::Pending,
            result: None,
            started_at: None,
        }
    }

    /// Record a successful evaluation.
    pub fn complete(&mut self, result: f64) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
    }

    /// Record a terminal evaluator failure.
    pub fn fail(&mut self) {
        self.status = TaskStatus::Error;
        self.result = None;
    }
}
