//! Poller: periodic discovery of pending work.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::domain::Task;
use crate::error::StoreError;
use crate::route;
use crate::store::TaskStore;

/// Poller handle. One recurring background task per agent.
pub struct Poller {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Poller {
    /// Spawn the poll loop. Each tick lists pending ids, re-checks each
    /// record, and hands non-terminal tasks to their lane.
    pub fn spawn(
        agent_id: u32,
        store: Arc<dyn TaskStore>,
        lanes: Vec<mpsc::Sender<Task>>,
        poll_interval: Duration,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            info!(
                agent_id,
                lanes = lanes.len(),
                poll_interval_ms = poll_interval.as_millis() as u64,
                "poller started",
            );

            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Separate receiver for the cycle, so a blocked lane send can
            // still observe shutdown while the outer select owns `shutdown_rx`.
            let mut cycle_rx = shutdown_rx.clone();

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(error) =
                            poll_cycle(agent_id, store.as_ref(), &lanes, &mut cycle_rx).await
                        {
                            // Drop this cycle; the next tick retries. No
                            // dead-task tracking exists.
                            warn!(agent_id, %error, "poll cycle failed");
                        }
                    }
                }
            }
            debug!(agent_id, "poller stopped");
        });

        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn poll_cycle(
    agent_id: u32,
    store: &dyn TaskStore,
    lanes: &[mpsc::Sender<Task>],
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), StoreError> {
    for id in store.list_pending().await? {
        // Statuses can flip between the listing and the fetch; re-check.
        let Some(task) = store.get(id).await? else {
            continue;
        };
        if task.status.is_terminal() {
            continue;
        }

        let lane = route::lane(&id, lanes.len());
        debug!(agent_id, task_id = %id, lane, "routing task");

        // Blocking delivery: a saturated lane stalls the rest of this
        // cycle (simplicity over fairness). Shutdown still interrupts.
        tokio::select! {
            _ = shutdown_rx.changed() => return Ok(()),
            sent = lanes[lane].send(task) => {
                if sent.is_err() {
                    // Lane closed: the pool is shutting down.
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}
