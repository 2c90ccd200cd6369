use crate::AppState;
use crate::api::error::AppError;
use crate::services::orchestrator::{DrainOutcome, DrainReport};
use axum::{Json, extract::State};

#[utoipa::path(
    post,
    path = "/sync",
    responses(
        (status = 200, description = "Drain cycle finished", body = DrainReport),
        (status = 409, description = "A drain is already running")
    ),
    tag = "sync"
)]
pub async fn trigger_sync(State(state): State<AppState>) -> Result<Json<DrainReport>, AppError> {
    // A manual trigger refreshes connectivity first, so the drain does not stop at once
    if !state.monitor.is_online() {
        state.monitor.check_now().await;
    }

    match state.orchestrator.drain().await? {
        DrainOutcome::Completed(report) => Ok(Json(report)),
        DrainOutcome::AlreadyRunning => Err(AppError::Conflict(
            "A sync is already in progress".to_string(),
        )),
    }
}
