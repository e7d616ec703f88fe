use serde::{Deserialize, Serialize};

/// Status totals across the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub completed: usize,
    pub error: usize,
}

impl TaskCounts {
    /// True when no task is waiting for a worker.
    pub fn settled(&self) -> bool {
        self.pending == 0
    }

    pub fn total(&self) -> usize {
        self.pending + self.completed + self.error
    }
}
