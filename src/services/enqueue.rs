use crate::error::LocalStoreError;
use crate::models::NewUpload;
use crate::services::events::{EventBus, SyncEvent};
use crate::services::queue_store::QueueStore;
use serde::Serialize;
use utoipa::ToSchema;

/// Answer given to the caller once a file is safely stored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Enqueued {
    /// Always true: the file will be uploaded by a later drain.
    pub offline: bool,
    pub id: i64,
}

/// Entry point for uploads that cannot reach the remote right now.
#[derive(Clone)]
pub struct EnqueueGateway {
    store: QueueStore,
    events: EventBus,
}

impl EnqueueGateway {
    pub fn new(store: QueueStore, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Fails only if the local queue itself is unavailable.
    pub async fn enqueue(&self, upload: NewUpload) -> Result<Enqueued, LocalStoreError> {
        let name = upload.file.name.clone();
        let saved = self.store.append(upload).await.inspect_err(|e| {
            tracing::error!("❌ Could not save {} offline: {}", name, e);
        })?;

        tracing::info!("💾 {} saved offline. Will sync later.", name);
        self.events.publish(SyncEvent::UploadQueued { id: saved.id, name });

        Ok(Enqueued {
            offline: true,
            id: saved.id,
        })
    }
}
