//! Periodic ARP cache maintenance
//!
//! Runs [`Router::sweep`] on a fixed period in a tokio task. The task lives
//! as long as its [`Sweeper`] handle.

use crate::dataplane::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Handle to a running sweep task
pub struct Sweeper {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn the sweep loop on the current runtime.
    ///
    /// The first sweep runs one `period` after spawning.
    pub fn spawn(router: Arc<Router>, period: Duration) -> Self {
        let (tx, mut rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; skip that tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    _ = ticker.tick() => router.sweep(),
                }
            }
            debug!("ARP sweeper stopped");
        });

        Self {
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    /// Stop the loop and wait for the task to finish.
    ///
    /// A sweep already in progress completes first.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("ARP sweeper task failed: {}", e);
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
