//! Agent: one poller + one worker pool + one lock manager.
//!
//! Several agents may run against the same store, as separate tasks in one
//! process or as separate processes. The store-mediated locks are the only
//! synchronization between them.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::eval::LatencyProfile;
use crate::lock::LockManager;
use crate::poller::Poller;
use crate::store::TaskStore;
use crate::worker::WorkerPool;

/// Per-agent tuning knobs.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub workers: usize,
    pub poll_interval: Duration,
    /// Staleness bound for store locks. `None` means manual release only.
    pub lock_ttl: Option<Duration>,
    pub latency: LatencyProfile,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            poll_interval: Duration::from_secs(5),
            lock_ttl: Some(Duration::from_secs(60)),
            latency: LatencyProfile::default(),
        }
    }
}

/// A running agent.
pub struct Agent {
    id: u32,
    poller: Poller,
    pool: WorkerPool,
}

impl Agent {
    pub fn spawn(id: u32, store: Arc<dyn TaskStore>, config: AgentConfig) -> Self {
        info!(agent_id = id, workers = config.workers, "starting agent");

        let locks = Arc::new(LockManager::new(Arc::clone(&store), config.lock_ttl));
        let pool = WorkerPool::spawn(id, config.workers, Arc::clone(&store), locks, config.latency);
        let poller = Poller::spawn(id, store, pool.lanes().to_vec(), config.poll_interval);

        Self { id, poller, pool }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Stop the poller first so no new work lands in the lanes, then the
    /// workers.
    pub async fn shutdown_and_join(self) {
        self.poller.shutdown_and_join().await;
        self.pool.shutdown_and_join().await;
        info!(agent_id = self.id, "agent stopped");
    }
}
