use crate::error::{LocalStoreError, RemoteError, UploadError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Local store error: {0}")]
    LocalStore(#[from] LocalStoreError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::TooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            UploadError::InvalidName(_) => AppError::BadRequest(e.to_string()),
            UploadError::LocalStore(e) => AppError::LocalStore(e),
            UploadError::Remote(e) => AppError::Remote(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::LocalStore(e) => {
                tracing::error!("Local store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Local upload queue unavailable".to_string(),
                )
            }
            AppError::Remote(e) => {
                let status = match e {
                    RemoteError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    RemoteError::Quota(_) => StatusCode::INSUFFICIENT_STORAGE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
