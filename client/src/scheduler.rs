//! Background sync.
//!
//! A [`SyncScheduler`] runs a silent sync every interval and as soon as the
//! gateway announces a remote change. Ticks that land while another
//! operation holds the state are skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::gateway::ChangeNotice;
use crate::sync::{QuoteSync, SyncOptions};

/// Handle to a running background sync task.
#[derive(Debug)]
pub struct SyncScheduler {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Start syncing `sync` every `interval` and on remote change
    /// notifications. The first periodic sync fires one interval from now.
    pub fn spawn(sync: Arc<QuoteSync>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let mut changes = sync.remote_changes();

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(interval_secs = interval.as_secs(), "sync scheduler started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => run_sync(&sync, "interval").await,
                    changed = next_change(&mut changes) => {
                        if changed {
                            run_sync(&sync, "remote change").await;
                        }
                    }
                }
            }

            tracing::info!("sync scheduler stopped");
        });

        Self { shutdown, task }
    }

    /// Stop the task and wait for it to finish. A sync in flight completes
    /// first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "sync scheduler task failed");
        }
    }
}

async fn run_sync(sync: &QuoteSync, trigger: &'static str) {
    match sync.try_sync(SyncOptions::silent()).await {
        Ok(Some(summary)) => {
            tracing::debug!(trigger, conflicts = summary.conflicts, "scheduled sync done")
        }
        Ok(None) => {}
        // Already logged by the sync itself; the next tick retries.
        Err(e) => tracing::debug!(trigger, error = %e, "scheduled sync failed"),
    }
}

/// Wait for the next remote change. Resolves to `false` when the channel
/// closes, after which it never resolves again.
async fn next_change(changes: &mut Option<broadcast::Receiver<ChangeNotice>>) -> bool {
    let Some(rx) = changes.as_mut() else {
        return std::future::pending().await;
    };

    let received = rx.recv().await;
    match received {
        Ok(notice) => {
            tracing::debug!(ids = notice.ids.len(), "remote change announced");
            true
        }
        Err(RecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "remote change notifications lagged");
            true
        }
        Err(RecvError::Closed) => {
            *changes = None;
            false
        }
    }
}
