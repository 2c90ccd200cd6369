pub mod bucket_upload;
pub mod object_store;
pub mod records;

use crate::error::RemoteError;
use crate::models::{FileBlob, FileRecord};
use async_trait::async_trait;

/// Everything the remote needs to store one file.
#[derive(Debug, Clone, Copy)]
pub struct PutFileRequest<'a> {
    /// Stable across retries of the same upload; makes repeated calls idempotent.
    pub upload_key: &'a str,
    pub file: &'a FileBlob,
    pub owner_id: &'a str,
    pub account_id: &'a str,
}

/// The managed storage backend as seen by the sync core.
#[async_trait]
pub trait RemoteUploadService: Send + Sync {
    async fn put_file(&self, request: PutFileRequest<'_>) -> Result<FileRecord, RemoteError>;

    /// Removes whatever an unfinished upload under `upload_key` left behind.
    /// Files that completed on the remote are kept.
    async fn release_file(&self, upload_key: &str) -> Result<(), RemoteError>;
}
