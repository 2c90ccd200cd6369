use crate::entities::pending_uploads::{self, STATUS_PARKED, STATUS_PENDING};
use crate::utils::file_type::FileType;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// File content materialized as bytes plus its declared name and type.
///
/// The queue owns these buffers; nothing downstream holds a handle into the
/// originating request or filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlob {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Builds a blob, sniffing the content type from magic bytes when none was declared.
    pub fn detect(name: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        let content_type = content_type
            .filter(|ct| !ct.trim().is_empty())
            .or_else(|| infer::get(&bytes).map(|kind| kind.mime_type().to_string()))
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        Self::new(name, content_type, bytes)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Hex-encoded SHA-256 of the content.
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// An upload request that has not been stored anywhere yet.
#[derive(Debug, Clone)]
pub struct NewUpload {
    /// Idempotency key, reused for every remote attempt of this file.
    pub upload_key: String,
    pub file: FileBlob,
    pub owner_id: String,
    pub account_id: String,
    /// Originating view, used by consumers for cache invalidation.
    pub path: String,
}

impl NewUpload {
    pub fn new(
        file: FileBlob,
        owner_id: impl Into<String>,
        account_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            upload_key: Uuid::new_v4().to_string(),
            file,
            owner_id: owner_id.into(),
            account_id: account_id.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Parked,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => STATUS_PENDING,
            QueueStatus::Parked => STATUS_PARKED,
        }
    }

    /// Unknown values written by a newer release are treated as pending.
    pub fn parse(value: &str) -> Self {
        match value {
            STATUS_PARKED => QueueStatus::Parked,
            _ => QueueStatus::Pending,
        }
    }
}

/// One queued file that has not been confirmed on the remote yet.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub id: i64,
    pub upload_key: String,
    pub file: FileBlob,
    pub checksum: String,
    pub owner_id: String,
    pub account_id: String,
    pub path: String,
    /// Epoch millis.
    pub created_at: i64,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Epoch millis before which drains skip this record.
    pub next_attempt_at: i64,
    pub status: QueueStatus,
}

impl PendingUpload {
    /// Pending and past its backoff window.
    pub fn is_eligible(&self, now_millis: i64) -> bool {
        self.status == QueueStatus::Pending && self.next_attempt_at <= now_millis
    }

    pub fn verify_checksum(&self) -> bool {
        self.file.checksum() == self.checksum
    }

    pub fn summary(&self) -> PendingUploadSummary {
        PendingUploadSummary {
            id: self.id,
            file_name: self.file.name.clone(),
            content_type: self.file.content_type.clone(),
            size: self.file.size() as i64,
            owner_id: self.owner_id.clone(),
            account_id: self.account_id.clone(),
            path: self.path.clone(),
            created_at: self.created_at,
            attempts: self.attempts,
            last_error: self.last_error.clone(),
            next_attempt_at: self.next_attempt_at,
            status: self.status,
        }
    }
}

impl From<pending_uploads::Model> for PendingUpload {
    fn from(model: pending_uploads::Model) -> Self {
        Self {
            id: model.id,
            upload_key: model.upload_key,
            file: FileBlob::new(
                model.file_name,
                model.content_type,
                Bytes::from(model.file_bytes),
            ),
            checksum: model.checksum,
            owner_id: model.owner_id,
            account_id: model.account_id,
            path: model.path,
            created_at: model.created_at,
            attempts: model.attempts.max(0) as u32,
            last_error: model.last_error,
            next_attempt_at: model.next_attempt_at,
            status: QueueStatus::parse(&model.status),
        }
    }
}

/// Queue entry as shown to UI consumers, without the file content.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingUploadSummary {
    pub id: i64,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
    pub owner_id: String,
    pub account_id: String,
    pub path: String,
    pub created_at: i64,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub next_attempt_at: i64,
    pub status: QueueStatus,
}

/// Metadata document created on the remote for every stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileDocument {
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub full_name: String,
    pub url: String,
    pub extension: String,
    pub size: i64,
    pub owner: String,
    pub account_id: String,
    #[serde(default)]
    pub users: Vec<String>,
    pub bucket_file_id: String,
}

/// A file document as returned by the remote, with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(flatten)]
    pub document: FileDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_declared_type() {
        let blob = FileBlob::detect("a.bin", Some("text/plain".into()), Bytes::from_static(b"%PDF-1.7"));
        assert_eq!(blob.content_type, "text/plain");
    }

    #[test]
    fn test_detect_sniffs_magic_bytes() {
        let blob = FileBlob::detect("report", None, Bytes::from_static(b"%PDF-1.7 rest"));
        assert_eq!(blob.content_type, "application/pdf");

        let blob = FileBlob::detect("notes", Some("  ".into()), Bytes::from_static(b"plain words"));
        assert_eq!(blob.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_unknown_status_reads_as_pending() {
        assert_eq!(QueueStatus::parse("parked"), QueueStatus::Parked);
        assert_eq!(QueueStatus::parse("pending"), QueueStatus::Pending);
        assert_eq!(QueueStatus::parse("archived"), QueueStatus::Pending);
    }

    #[test]
    fn test_file_record_ignores_unknown_fields() {
        let json = r#"{
            "$id": "doc-1",
            "$collectionId": "files",
            "type": "document",
            "fullName": "report.pdf",
            "url": "http://cdn/files/x",
            "extension": "pdf",
            "size": 10,
            "owner": "u1",
            "accountId": "a1",
            "bucketFileId": "files/x"
        }"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "doc-1");
        assert_eq!(record.document.file_type, FileType::Document);
        assert!(record.document.users.is_empty());
    }
}
