use super::object_store::ObjectStore;
use super::records::FileRecordStore;
use super::{PutFileRequest, RemoteUploadService};
use crate::error::RemoteError;
use crate::models::{FileDocument, FileRecord};
use crate::utils::file_type::classify_file;
use async_trait::async_trait;
use std::sync::Arc;

/// Stores the bytes in the bucket, then creates the metadata document.
///
/// The two writes form a compensating pair: when the document cannot be
/// created the object is deleted again before the error is returned.
pub struct BucketUploadService {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn FileRecordStore>,
    public_base_url: String,
}

impl BucketUploadService {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn FileRecordStore>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            records,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn object_key(upload_key: &str) -> String {
        format!("files/{}", upload_key)
    }

    fn file_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), object_key)
    }

    async fn reclaim(&self, object_key: &str) -> bool {
        match self.objects.delete_object(object_key).await {
            Ok(()) => {
                tracing::info!("♻️  Reclaimed orphaned object {}", object_key);
                true
            }
            Err(e) => {
                tracing::error!("❌ Failed to reclaim orphaned object {}: {}", object_key, e);
                false
            }
        }
    }
}

#[async_trait]
impl RemoteUploadService for BucketUploadService {
    async fn put_file(&self, request: PutFileRequest<'_>) -> Result<FileRecord, RemoteError> {
        let object_key = Self::object_key(request.upload_key);

        self.objects
            .put_object(
                &object_key,
                request.file.bytes.to_vec(),
                &request.file.content_type,
            )
            .await?;

        let (file_type, extension) = classify_file(&request.file.name);
        let document = FileDocument {
            file_type,
            full_name: request.file.name.clone(),
            url: self.file_url(&object_key),
            extension,
            size: request.file.size() as i64,
            owner: request.owner_id.to_string(),
            account_id: request.account_id.to_string(),
            users: Vec::new(),
            bucket_file_id: object_key.clone(),
        };

        let cause = match self
            .records
            .create_record(request.upload_key, &document)
            .await
        {
            Ok(record) => return Ok(record),
            // An earlier attempt got this far; its document must point at this object
            Err(RemoteError::AlreadyExists(_)) => {
                match self.records.get_record(request.upload_key).await {
                    Ok(Some(record)) if record.document.bucket_file_id == object_key => {
                        return Ok(record);
                    }
                    Ok(Some(record)) => RemoteError::AlreadyExists(format!(
                        "document {} points at {}",
                        request.upload_key, record.document.bucket_file_id
                    )),
                    Ok(None) => RemoteError::Unknown(format!(
                        "document {} reported as existing but not found",
                        request.upload_key
                    )),
                    Err(e) => e,
                }
            }
            Err(cause) => cause,
        };

        tracing::warn!(
            "⚠️ Metadata creation failed for {}, rolling back object: {}",
            object_key,
            cause
        );
        let reclaimed = self.reclaim(&object_key).await;
        Err(RemoteError::PartialWrite {
            object_key,
            reclaimed,
            cause: Box::new(cause),
        })
    }

    async fn release_file(&self, upload_key: &str) -> Result<(), RemoteError> {
        // A live document owns the object; only an unreferenced one is removed
        if self.records.get_record(upload_key).await?.is_some() {
            return Ok(());
        }
        let object_key = Self::object_key(upload_key);
        if self.objects.object_exists(&object_key).await? {
            self.objects.delete_object(&object_key).await?;
            tracing::info!("♻️  Removed unreferenced object {}", object_key);
        }
        Ok(())
    }
}
