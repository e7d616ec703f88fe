//! Worker pool: one worker per lane, draining its queue serially.
//!
//! Per-lane FIFO is the only ordering guarantee. Across lanes (and across
//! agents) there is none.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{Task, TaskId};
use crate::error::StoreError;
use crate::eval::{self, LatencyProfile};
use crate::lock::LockManager;
use crate::store::TaskStore;

/// Capacity of each lane queue. Kept small on purpose: a saturated lane
/// makes the poller's send block, which is the back-pressure story.
const LANE_CAPACITY: usize = 1;

/// Worker pool handle.
/// - `shutdown_tx` を送るとワーカー全体が止まる
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    lanes: Vec<mpsc::Sender<Task>>,
}

impl WorkerPool {
    /// Spawn `lanes` workers, each bound to its own queue for its lifetime.
    pub fn spawn(
        agent_id: u32,
        lanes: usize,
        store: Arc<dyn TaskStore>,
        locks: Arc<LockManager>,
        latency: LatencyProfile,
    ) -> Self {
        let lanes = lanes.max(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut senders = Vec::with_capacity(lanes);
        let mut joins = Vec::with_capacity(lanes);
        for lane_id in 0..lanes {
            let (tx, rx) = mpsc::channel(LANE_CAPACITY);
            senders.push(tx);

            let store = Arc::clone(&store);
            let locks = Arc::clone(&locks);
            let mut rx_shutdown = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                worker_loop(agent_id, lane_id, rx, store, locks, latency, &mut rx_shutdown).await;
            }));
        }

        info!(agent_id, workers = lanes, "worker pool started");
        Self {
            shutdown_tx,
            joins,
            lanes: senders,
        }
    }

    /// Lane senders, indexed by the router's lane numbers.
    pub fn lanes(&self) -> &[mpsc::Sender<Task>] {
        &self.lanes
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Request shutdown for all workers. In-flight evaluations are not
    /// cancelled; workers just stop taking new tasks.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        drop(self.lanes); // close the queues so a blocked recv ends too
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(
    agent_id: u32,
    lane_id: usize,
    mut lane: mpsc::Receiver<Task>,
    store: Arc<dyn TaskStore>,
    locks: Arc<LockManager>,
    latency: LatencyProfile,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        // shutdown が来ていたら抜ける
        if *shutdown_rx.borrow() {
            break;
        }

        let task = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            task = lane.recv() => match task {
                Some(task) => task,
                None => break, // every sender is gone, lane is closed
            },
        };

        if let Err(error) = process_task(agent_id, lane_id, &task, &store, &locks, &latency).await {
            // Store failure: the task stays pending and a later poll
            // cycle delivers it again.
            warn!(agent_id, lane_id, task_id = %task.id, %error, "task abandoned");
        }
    }
    debug!(agent_id, lane_id, "worker stopped");
}

/// Lock → re-fetch → evaluate → persist → unlock.
async fn process_task(
    agent_id: u32,
    lane_id: usize,
    task: &Task,
    store: &Arc<dyn TaskStore>,
    locks: &LockManager,
    latency: &LatencyProfile,
) -> Result<(), StoreError> {
    if !locks.try_acquire(task.id).await? {
        // Lock contention is not an error: skip, the poller rediscovers.
        debug!(agent_id, lane_id, task_id = %task.id, "lock held elsewhere, skipping");
        return Ok(());
    }

    let outcome = run_locked(agent_id, lane_id, task.id, store, latency).await;

    // Release on success and failure alike. A failed unlock leaks the row
    // until its TTL expires; nothing self-heals beyond that.
    if let Err(error) = locks.release(task.id).await {
        warn!(agent_id, lane_id, task_id = %task.id, %error, "unlock failed, lock leaks until ttl");
    }

    outcome
}

async fn run_locked(
    agent_id: u32,
    lane_id: usize,
    id: TaskId,
    store: &Arc<dyn TaskStore>,
    latency: &LatencyProfile,
) -> Result<(), StoreError> {
    // Re-read under the lock: the queued copy may be a stale duplicate
    // from an earlier poll cycle, already finished by someone else.
    let Some(mut task) = store.get(id).await? else {
        return Ok(()); // deleted by an administrator, nothing to do
    };
    if task.status.is_terminal() {
        return Ok(());
    }

    debug!(agent_id, lane_id, task_id = %task.id, expression = %task.expression, "processing");
    match eval::evaluate(&task.expression, latency).await {
        Ok(value) => {
            task.complete(value);
            info!(agent_id, lane_id, task_id = %task.id, result = value, "task completed");
        }
        Err(error) => {
            task.fail();
            info!(agent_id, lane_id, task_id = %task.id, %error, "task failed");
        }
    }
    store.put(task).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ulid::Ulid;

    use super::*;
    use crate::domain::{TaskId, TaskStatus};
    use crate::store::InMemoryTaskStore;

    fn fixture() -> (Arc<dyn TaskStore>, Arc<LockManager>) {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let locks = Arc::new(LockManager::new(Arc::clone(&store), None));
        (store, locks)
    }

    async fn wait_for_status(store: &Arc<dyn TaskStore>, id: TaskId, status: TaskStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(task) = store.get(id).await.unwrap() {
                    if task.status == status {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("status never reached");
    }

    #[tokio::test]
    async fn worker_evaluates_a_delivered_task() {
        let (store, locks) = fixture();
        let pool = WorkerPool::spawn(1, 1, Arc::clone(&store), locks, LatencyProfile::default());

        let task = Task::new_pending(TaskId::from(Ulid::new()), "3 + 4 * 2");
        store.put(task.clone()).await.unwrap();
        pool.lanes()[0].send(task.clone()).await.unwrap();

        wait_for_status(&store, task.id, TaskStatus::Completed).await;
        let stored = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.result, Some(11.0));

        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn evaluator_errors_are_terminal() {
        let (store, locks) = fixture();
        let pool = WorkerPool::spawn(1, 1, Arc::clone(&store), locks, LatencyProfile::default());

        let task = Task::new_pending(TaskId::from(Ulid::new()), "6 / 0");
        store.put(task.clone()).await.unwrap();
        pool.lanes()[0].send(task.clone()).await.unwrap();

        wait_for_status(&store, task.id, TaskStatus::Error).await;
        let stored = store.get(task.id).await.unwrap().unwrap();
        assert!(stored.result.is_none());

        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn a_held_lock_makes_the_worker_skip() {
        let (store, locks) = fixture();
        let task = Task::new_pending(TaskId::from(Ulid::new()), "1 + 2");
        store.put(task.clone()).await.unwrap();

        // Another agent already holds the lock.
        assert!(store.try_lock(task.id, None).await.unwrap());

        let pool = WorkerPool::spawn(1, 1, Arc::clone(&store), locks, LatencyProfile::default());
        pool.lanes()[0].send(task.clone()).await.unwrap();

        // The worker must leave the task untouched.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stored = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);

        // Once the other agent lets go, the next delivery completes it.
        store.unlock(task.id).await.unwrap();
        pool.lanes()[0].send(task.clone()).await.unwrap();
        wait_for_status(&store, task.id, TaskStatus::Completed).await;

        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn stale_duplicate_delivery_is_skipped() {
        let (store, locks) = fixture();
        let pool = WorkerPool::spawn(1, 1, Arc::clone(&store), locks, LatencyProfile::default());

        let task = Task::new_pending(TaskId::from(Ulid::new()), "1 + 2");
        store.put(task.clone()).await.unwrap();

        pool.lanes()[0].send(task.clone()).await.unwrap();
        wait_for_status(&store, task.id, TaskStatus::Completed).await;

        // A second delivery of the same stale pending-looking copy: the
        // re-read under the lock sees a terminal status and backs off.
        pool.lanes()[0].send(task.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.result, Some(3.0));

        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn one_lane_processes_in_delivery_order() {
        let (store, locks) = fixture();
        let pool = WorkerPool::spawn(1, 1, Arc::clone(&store), locks, LatencyProfile::default());

        let first = Task::new_pending(TaskId::from(Ulid::new()), "1 + 1");
        let second = Task::new_pending(TaskId::from(Ulid::new()), "2 + 2");
        store.put(first.clone()).await.unwrap();
        store.put(second.clone()).await.unwrap();

        pool.lanes()[0].send(first.clone()).await.unwrap();
        pool.lanes()[0].send(second.clone()).await.unwrap();

        wait_for_status(&store, second.id, TaskStatus::Completed).await;
        // FIFO within the lane: by the time the second is done, the first
        // must be as well.
        let stored = store.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);

        pool.shutdown_and_join().await;
    }
}
