use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub online: bool,
    pub draining: bool,
    /// Queued uploads, pending and parked; null when the queue cannot be read.
    pub queue: Option<u64>,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Sync agent health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: db_status.to_string(),
        online: state.monitor.is_online(),
        draining: state.orchestrator.is_draining(),
        queue: state.store.count().await.ok(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
