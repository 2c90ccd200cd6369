use crate::AppState;
use crate::api::error::AppError;
use crate::models::{FileBlob, FileRecord, NewUpload, PendingUploadSummary};
use crate::services::queue_store::RemoveOutcome;
use crate::services::upload_client::UploadOutcome;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// True when the file was saved locally and will sync later.
    pub offline: bool,
    /// Queue id, set when `offline` is true.
    pub id: Option<i64>,
    /// Remote file document, set when the upload went through directly.
    pub file: Option<FileRecord>,
}

#[utoipa::path(
    get,
    path = "/uploads",
    responses(
        (status = 200, description = "Queued uploads in insertion order", body = Vec<PendingUploadSummary>)
    ),
    tag = "uploads"
)]
pub async fn list_uploads(
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingUploadSummary>>, AppError> {
    let uploads = state.store.list_all().await?;
    Ok(Json(uploads.iter().map(|u| u.summary()).collect()))
}

#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content = Object, description = "Fields: file, ownerId, accountId, path", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded directly", body = UploadResponse),
        (status = 202, description = "Saved offline, will sync later", body = UploadResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 413, description = "File too large")
    ),
    tag = "uploads"
)]
pub async fn create_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut file = None;
    let mut owner_id = None;
    let mut account_id = None;
    let mut path = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some(FileBlob::detect(file_name, content_type, bytes));
            }
            "ownerId" => owner_id = Some(text_field(field).await?),
            "accountId" => account_id = Some(text_field(field).await?),
            "path" => path = text_field(field).await?,
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let owner_id = owner_id.ok_or_else(|| AppError::BadRequest("ownerId is required".to_string()))?;
    let account_id =
        account_id.ok_or_else(|| AppError::BadRequest("accountId is required".to_string()))?;

    let upload = NewUpload::new(file, owner_id, account_id, path);

    match state.upload_client.upload(upload).await? {
        UploadOutcome::Uploaded(record) => Ok((
            StatusCode::OK,
            Json(UploadResponse {
                offline: false,
                id: None,
                file: Some(record),
            }),
        )),
        UploadOutcome::SavedOffline(enqueued) => Ok((
            StatusCode::ACCEPTED,
            Json(UploadResponse {
                offline: true,
                id: Some(enqueued.id),
                file: None,
            }),
        )),
    }
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/uploads/{id}/requeue",
    params(
        ("id" = i64, Path, description = "Queue id")
    ),
    responses(
        (status = 204, description = "Record is pending again"),
        (status = 404, description = "No such queued upload")
    ),
    tag = "uploads"
)]
pub async fn requeue_upload(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.store.requeue(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Queued upload {} not found", id)))
    }
}

#[utoipa::path(
    delete,
    path = "/uploads/{id}",
    params(
        ("id" = i64, Path, description = "Queue id")
    ),
    responses(
        (status = 204, description = "Record discarded without uploading"),
        (status = 404, description = "No such queued upload"),
        (status = 502, description = "Leftovers of an earlier attempt could not be released")
    ),
    tag = "uploads"
)]
pub async fn discard_upload(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    match state.dispatcher.discard(id).await? {
        RemoveOutcome::Removed => Ok(StatusCode::NO_CONTENT),
        RemoveOutcome::NotFound => Err(AppError::NotFound(format!(
            "Queued upload {} not found",
            id
        ))),
    }
}
