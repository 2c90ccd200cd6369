use crate::error::UploadError;
use crate::models::{FileRecord, NewUpload};
use crate::services::connectivity::ConnectivityMonitor;
use crate::services::enqueue::{EnqueueGateway, Enqueued};
use crate::services::remote::{PutFileRequest, RemoteUploadService};
use crate::utils::validation::{sanitize_filename, validate_file_size};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum UploadOutcome {
    /// Stored on the remote right away.
    Uploaded(FileRecord),
    /// Kept in the local queue for a later drain.
    SavedOffline(Enqueued),
}

/// Upload-initiating flow: remote first, local queue when the network is in the way.
pub struct UploadClient {
    remote: Arc<dyn RemoteUploadService>,
    monitor: Arc<ConnectivityMonitor>,
    gateway: EnqueueGateway,
    max_file_size: usize,
}

impl UploadClient {
    pub fn new(
        remote: Arc<dyn RemoteUploadService>,
        monitor: Arc<ConnectivityMonitor>,
        gateway: EnqueueGateway,
        max_file_size: usize,
    ) -> Self {
        Self {
            remote,
            monitor,
            gateway,
            max_file_size,
        }
    }

    pub async fn upload(&self, mut upload: NewUpload) -> Result<UploadOutcome, UploadError> {
        validate_file_size(upload.file.size(), self.max_file_size)?;
        upload.file.name = sanitize_filename(&upload.file.name)?;

        if !self.monitor.is_online() {
            return Ok(UploadOutcome::SavedOffline(self.gateway.enqueue(upload).await?));
        }

        let request = PutFileRequest {
            upload_key: &upload.upload_key,
            file: &upload.file,
            owner_id: &upload.owner_id,
            account_id: &upload.account_id,
        };

        match self.remote.put_file(request).await {
            Ok(record) => {
                tracing::info!("✅ {} uploaded successfully", upload.file.name);
                Ok(UploadOutcome::Uploaded(record))
            }
            // A leftover object stays reachable through the queued upload_key
            Err(e) if e.needs_retry() => {
                tracing::warn!("⚠️ Direct upload of {} failed, queueing: {}", upload.file.name, e);
                Ok(UploadOutcome::SavedOffline(self.gateway.enqueue(upload).await?))
            }
            Err(e) => {
                tracing::error!("❌ Upload failed for {}: {}", upload.file.name, e);
                Err(e.into())
            }
        }
    }
}
