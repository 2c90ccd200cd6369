use crate::error::LocalStoreError;
use crate::models::PendingUpload;
use crate::services::connectivity::ConnectivityMonitor;
use crate::services::dispatcher::{DispatchOutcome, UploadDispatcher};
use crate::services::events::{EventBus, SyncEvent};
use crate::services::queue_store::QueueStore;
use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

/// Tally of one drain cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Records in the queue when the cycle started.
    pub snapshot: usize,
    pub attempted: usize,
    pub synced: usize,
    pub deferred: usize,
    pub parked: usize,
    /// Parked or still backing off; left alone this cycle.
    pub skipped: usize,
    /// Connectivity dropped before every eligible record was attempted.
    pub interrupted: bool,
    /// Queue size after the cycle.
    pub remaining: u64,
    /// `uploads-flushed` was published.
    pub flushed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain held the lock; nothing was done.
    AlreadyRunning,
    Completed(DrainReport),
}

/// Drains the queue against the remote whenever connectivity is confirmed.
///
/// At most one drain runs at a time. Each drain works on a snapshot taken at
/// its start, attempts every eligible record at most once in insertion
/// order, and stops issuing new attempts as soon as the monitor reports offline.
pub struct SyncOrchestrator {
    store: QueueStore,
    dispatcher: Arc<UploadDispatcher>,
    monitor: Arc<ConnectivityMonitor>,
    events: EventBus,
    concurrency: usize,
    draining: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        store: QueueStore,
        dispatcher: Arc<UploadDispatcher>,
        monitor: Arc<ConnectivityMonitor>,
        events: EventBus,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            dispatcher,
            monitor,
            events,
            concurrency: concurrency.max(1),
            draining: Mutex::new(()),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.try_lock().is_err()
    }

    /// Runs one drain cycle, or returns `AlreadyRunning` without waiting.
    pub async fn drain(&self) -> Result<DrainOutcome, LocalStoreError> {
        let Ok(_guard) = self.draining.try_lock() else {
            tracing::debug!("Drain already in progress, skipping trigger");
            return Ok(DrainOutcome::AlreadyRunning);
        };

        let snapshot = self.store.list_all().await?;
        let total = snapshot.len();
        let now = Utc::now().timestamp_millis();
        let (eligible, waiting): (Vec<PendingUpload>, Vec<PendingUpload>) = snapshot
            .into_iter()
            .partition(|upload| upload.is_eligible(now));

        let mut report = DrainReport {
            snapshot: total,
            skipped: waiting.len(),
            ..Default::default()
        };

        if !eligible.is_empty() {
            tracing::info!("🔄 Syncing {} pending upload(s)...", eligible.len());
        }

        // Set on connectivity loss or a queue store failure; no new dispatch starts after that
        let stopped = AtomicBool::new(false);
        let results: Vec<Option<Result<DispatchOutcome, LocalStoreError>>> =
            futures::stream::iter(eligible)
                .map(|upload| {
                    let stopped = &stopped;
                    async move {
                        if stopped.load(Ordering::SeqCst) || !self.monitor.is_online() {
                            stopped.store(true, Ordering::SeqCst);
                            return None;
                        }
                        let result = self.dispatcher.dispatch(&upload).await;
                        match &result {
                            Err(_) => stopped.store(true, Ordering::SeqCst),
                            Ok(DispatchOutcome::Deferred { error, .. }) if error.is_transient() => {
                                if !self.monitor.check_now().await {
                                    stopped.store(true, Ordering::SeqCst);
                                }
                            }
                            Ok(_) => {}
                        }
                        Some(result)
                    }
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut fatal = None;
        for result in results {
            match result {
                None => report.interrupted = true,
                Some(Ok(outcome)) => {
                    report.attempted += 1;
                    match outcome {
                        DispatchOutcome::Synced(_) => report.synced += 1,
                        DispatchOutcome::Deferred { .. } => report.deferred += 1,
                        DispatchOutcome::Parked { .. } => report.parked += 1,
                    }
                }
                Some(Err(e)) => {
                    report.attempted += 1;
                    fatal.get_or_insert(e);
                }
            }
        }
        if let Some(e) = fatal {
            tracing::error!("❌ Queue store failed during drain: {}", e);
            return Err(e);
        }

        if report.interrupted {
            tracing::info!("🌐 Network not ready, remaining uploads wait for the next cycle");
        }

        report.remaining = self.store.count().await?;
        if report.attempted > 0 && !report.interrupted && report.remaining == 0 {
            self.events.publish(SyncEvent::UploadsFlushed);
            report.flushed = true;
            tracing::info!("✅ All pending uploads synced");
        }

        Ok(DrainOutcome::Completed(report))
    }

    /// Drains on every connectivity restore and every `resync_interval`
    /// while online, until shutdown.
    pub async fn run(
        &self,
        mut restored: broadcast::Receiver<()>,
        mut shutdown: watch::Receiver<bool>,
        resync_interval: Duration,
    ) {
        tracing::info!("🚀 Sync orchestrator started");

        let mut resync = tokio::time::interval(resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("🛑 Sync orchestrator shutting down");
                    break;
                }
                signal = restored.recv() => {
                    match signal {
                        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            tracing::info!("🌐 Back online, syncing pending uploads...");
                            self.drain_and_log().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = resync.tick() => {
                    if self.monitor.is_online() {
                        self.drain_and_log().await;
                    }
                }
            }
        }
    }

    async fn drain_and_log(&self) {
        match self.drain().await {
            Ok(DrainOutcome::Completed(report)) if report.attempted > 0 => {
                tracing::info!(
                    "📦 Drain finished: {} synced, {} deferred, {} parked, {} remaining",
                    report.synced,
                    report.deferred,
                    report.parked,
                    report.remaining
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!("❌ Drain aborted: {}", e),
        }
    }
}
