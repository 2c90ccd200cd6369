use crate::error::{LocalStoreError, RemoteError, UploadError};
use crate::models::{FileRecord, PendingUpload};
use crate::services::connectivity::ConnectivityMonitor;
use crate::services::events::{EventBus, SyncEvent};
use crate::services::queue_store::{QueueStore, RemoveOutcome};
use crate::services::remote::{PutFileRequest, RemoteUploadService};
use crate::services::retry::{RetryDecision, RetryPolicy};
use chrono::Utc;
use std::sync::Arc;

/// Result of one upload attempt for one queued record.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Remote confirmed; the record is gone from the queue.
    Synced(FileRecord),
    /// Transient failure; the record stays pending until `next_attempt_at`.
    Deferred {
        error: RemoteError,
        attempts: u32,
        next_attempt_at: i64,
    },
    /// Permanent failure or retry budget spent; the record stays parked.
    Parked { reason: String },
}

impl DispatchOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, DispatchOutcome::Synced(_))
    }
}

/// Uploads a single queued record and settles its queue entry.
///
/// Never retries on its own; the next drain cycle is the retry point.
pub struct UploadDispatcher {
    store: QueueStore,
    remote: Arc<dyn RemoteUploadService>,
    monitor: Arc<ConnectivityMonitor>,
    events: EventBus,
    retry: RetryPolicy,
}

impl UploadDispatcher {
    pub fn new(
        store: QueueStore,
        remote: Arc<dyn RemoteUploadService>,
        monitor: Arc<ConnectivityMonitor>,
        events: EventBus,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            remote,
            monitor,
            events,
            retry,
        }
    }

    /// Remote failures are reported through the outcome; only queue errors
    /// are returned as `Err`.
    pub async fn dispatch(
        &self,
        upload: &PendingUpload,
    ) -> Result<DispatchOutcome, LocalStoreError> {
        if !upload.verify_checksum() {
            let reason = "content checksum mismatch".to_string();
            tracing::error!("❌ Queued upload {} ({}) is corrupt, parking", upload.id, upload.file.name);
            self.store.park(upload.id, &reason).await?;
            self.publish_failure(upload, &reason, true);
            return Ok(DispatchOutcome::Parked { reason });
        }

        let request = PutFileRequest {
            upload_key: &upload.upload_key,
            file: &upload.file,
            owner_id: &upload.owner_id,
            account_id: &upload.account_id,
        };

        match self.remote.put_file(request).await {
            Ok(record) => {
                if self.store.remove_by_id(upload.id).await? == RemoveOutcome::NotFound {
                    tracing::warn!("Queued upload {} was already removed", upload.id);
                }
                tracing::info!("✅ Synced file: {} ({})", upload.file.name, record.id);
                self.events.publish(SyncEvent::UploadSynced {
                    id: upload.id,
                    name: upload.file.name.clone(),
                    path: upload.path.clone(),
                    file_id: record.id.clone(),
                });
                Ok(DispatchOutcome::Synced(record))
            }
            Err(error) => self.settle_failure(upload, error).await,
        }
    }

    /// Drops a queued upload on user request. Anything an earlier attempt left
    /// in the bucket is released first, so discarding never orphans an object.
    ///
    /// A record that was never settled can still own an object if the process
    /// died mid-attempt, so it is released too whenever the remote is reachable.
    /// Only an untried record is dropped offline without asking the remote.
    pub async fn discard(&self, id: i64) -> Result<RemoveOutcome, UploadError> {
        let Some(upload) = self.store.get(id).await? else {
            return Ok(RemoveOutcome::NotFound);
        };
        if upload.attempts > 0 || self.monitor.is_online() {
            self.remote.release_file(&upload.upload_key).await?;
        }
        Ok(self.store.discard(id).await?)
    }

    async fn settle_failure(
        &self,
        upload: &PendingUpload,
        error: RemoteError,
    ) -> Result<DispatchOutcome, LocalStoreError> {
        let attempts = upload.attempts + 1;
        let message = error.to_string();

        match self.retry.decide(&error, attempts) {
            RetryDecision::RetryAfter(delay) => {
                let next_attempt_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
                tracing::warn!(
                    "❌ Failed syncing {} (attempt {}/{}), retrying in {:?}: {}",
                    upload.file.name,
                    attempts,
                    self.retry.max_attempts,
                    delay,
                    message
                );
                self.store
                    .record_failure(upload.id, &message, next_attempt_at)
                    .await?;
                self.publish_failure(upload, &message, false);
                Ok(DispatchOutcome::Deferred {
                    error,
                    attempts,
                    next_attempt_at,
                })
            }
            RetryDecision::Park => {
                tracing::error!(
                    "❌ Failed syncing {} after {} attempt(s), parking ({:?}): {}",
                    upload.file.name,
                    attempts,
                    error.kind(),
                    message
                );
                self.store.park(upload.id, &message).await?;
                self.publish_failure(upload, &message, true);
                Ok(DispatchOutcome::Parked { reason: message })
            }
        }
    }

    fn publish_failure(&self, upload: &PendingUpload, error: &str, parked: bool) {
        self.events.publish(SyncEvent::UploadFailed {
            id: upload.id,
            name: upload.file.name.clone(),
            error: error.to_string(),
            parked,
        });
    }
}
