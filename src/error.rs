use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// The durable queue could not be read or written. Fatal for the caller.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("queue database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    Network,
    Validation,
    Quota,
    AlreadyExists,
    PartialWrite,
    Unknown,
}

/// Failure reported by the remote storage backend.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rejected by remote: {0}")]
    Validation(String),

    #[error("storage quota exceeded: {0}")]
    Quota(String),

    #[error("already exists on remote: {0}")]
    AlreadyExists(String),

    /// Object stored, metadata document failed. `reclaimed` tells whether the
    /// compensating delete removed the object again.
    #[error("partial remote write of {object_key} (object reclaimed: {reclaimed}): {cause}")]
    PartialWrite {
        object_key: String,
        reclaimed: bool,
        cause: Box<RemoteError>,
    },

    #[error("remote error: {0}")]
    Unknown(String),
}

impl RemoteError {
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            RemoteError::Network(_) => RemoteErrorKind::Network,
            RemoteError::Validation(_) => RemoteErrorKind::Validation,
            RemoteError::Quota(_) => RemoteErrorKind::Quota,
            RemoteError::AlreadyExists(_) => RemoteErrorKind::AlreadyExists,
            RemoteError::PartialWrite { .. } => RemoteErrorKind::PartialWrite,
            RemoteError::Unknown(_) => RemoteErrorKind::Unknown,
        }
    }

    /// Only network failures are worth another attempt on a later cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::PartialWrite { cause, .. } => cause.is_transient(),
            _ => false,
        }
    }

    /// Worth another attempt later. A partial write whose object survived the
    /// compensating delete counts too: only a rewrite of the same key reclaims it.
    pub fn needs_retry(&self) -> bool {
        self.is_transient()
            || matches!(self, RemoteError::PartialWrite { reclaimed: false, .. })
    }

    /// Maps an HTTP status returned by a remote collaborator.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            402 | 413 | 507 => RemoteError::Quota(message),
            408 | 429 | 500..=599 => RemoteError::Network(message),
            409 => RemoteError::AlreadyExists(message),
            400 | 404 | 415 | 422 => RemoteError::Validation(message),
            _ => RemoteError::Unknown(format!("status {}: {}", status, message)),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return RemoteError::from_status(status.as_u16(), e.to_string());
        }
        if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
            RemoteError::Network(e.to_string())
        } else {
            RemoteError::Unknown(e.to_string())
        }
    }
}

/// Errors surfaced to whoever initiated an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes ({} MB)", .max / 1024 / 1024)]
    TooLarge { size: usize, max: usize },

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    LocalStore(#[from] LocalStoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(RemoteError::from_status(503, "down").kind(), RemoteErrorKind::Network);
        assert_eq!(RemoteError::from_status(429, "slow").kind(), RemoteErrorKind::Network);
        assert_eq!(RemoteError::from_status(507, "full").kind(), RemoteErrorKind::Quota);
        assert_eq!(RemoteError::from_status(413, "big").kind(), RemoteErrorKind::Quota);
        assert_eq!(RemoteError::from_status(409, "dup").kind(), RemoteErrorKind::AlreadyExists);
        assert_eq!(RemoteError::from_status(422, "bad").kind(), RemoteErrorKind::Validation);
        assert_eq!(RemoteError::from_status(401, "who").kind(), RemoteErrorKind::Unknown);
    }

    #[test]
    fn test_partial_write_inherits_transience() {
        let transient = RemoteError::PartialWrite {
            object_key: "files/a".into(),
            reclaimed: true,
            cause: Box::new(RemoteError::Network("reset".into())),
        };
        assert!(transient.is_transient());

        let permanent = RemoteError::PartialWrite {
            object_key: "files/a".into(),
            reclaimed: true,
            cause: Box::new(RemoteError::Validation("schema".into())),
        };
        assert!(!permanent.is_transient());
        assert!(!RemoteError::Quota("full".into()).is_transient());
    }

    #[test]
    fn test_unreclaimed_partial_write_needs_retry() {
        let stuck = RemoteError::PartialWrite {
            object_key: "files/a".into(),
            reclaimed: false,
            cause: Box::new(RemoteError::Validation("schema".into())),
        };
        assert!(!stuck.is_transient());
        assert!(stuck.needs_retry());
        assert!(RemoteError::Network("reset".into()).needs_retry());
        assert!(!RemoteError::Validation("schema".into()).needs_retry());
    }
}
