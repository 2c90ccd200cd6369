pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::SyncConfig;
use crate::services::connectivity::{ConnectivityMonitor, ReachabilityProbe};
use crate::services::dispatcher::UploadDispatcher;
use crate::services::enqueue::EnqueueGateway;
use crate::services::events::EventBus;
use crate::services::orchestrator::SyncOrchestrator;
use crate::services::queue_store::QueueStore;
use crate::services::remote::RemoteUploadService;
use crate::services::retry::RetryPolicy;
use crate::services::upload_client::UploadClient;
use axum::{
    Router,
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::uploads::list_uploads,
        api::handlers::uploads::create_upload,
        api::handlers::uploads::requeue_upload,
        api::handlers::uploads::discard_upload,
        api::handlers::sync::trigger_sync,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::uploads::UploadResponse,
            models::PendingUploadSummary,
            models::QueueStatus,
            models::FileRecord,
            models::FileDocument,
            utils::file_type::FileType,
            services::orchestrator::DrainReport,
        )
    ),
    tags(
        (name = "system", description = "Agent status"),
        (name = "uploads", description = "Offline upload queue"),
        (name = "sync", description = "Queue synchronization")
    )
)]
pub struct ApiDoc;

/// Everything the sync agent runs on, wired together once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub store: QueueStore,
    pub events: EventBus,
    pub monitor: Arc<ConnectivityMonitor>,
    pub dispatcher: Arc<UploadDispatcher>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub upload_client: Arc<UploadClient>,
    pub config: SyncConfig,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        remote: Arc<dyn RemoteUploadService>,
        probe: Arc<dyn ReachabilityProbe>,
        config: SyncConfig,
    ) -> Self {
        let store = QueueStore::new(db.clone());
        let events = EventBus::new(config.event_capacity);
        let monitor = Arc::new(ConnectivityMonitor::new(probe, config.settle_delay));

        let dispatcher = Arc::new(UploadDispatcher::new(
            store.clone(),
            remote.clone(),
            monitor.clone(),
            events.clone(),
            RetryPolicy::from_config(&config),
        ));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            store.clone(),
            dispatcher.clone(),
            monitor.clone(),
            events.clone(),
            config.drain_concurrency,
        ));
        let gateway = EnqueueGateway::new(store.clone(), events.clone());
        let upload_client = Arc::new(UploadClient::new(
            remote,
            monitor.clone(),
            gateway,
            config.max_file_size,
        ));

        Self {
            db,
            store,
            events,
            monitor,
            dispatcher,
            orchestrator,
            upload_client,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/uploads",
            get(api::handlers::uploads::list_uploads).post(api::handlers::uploads::create_upload),
        )
        .route(
            "/uploads/:id",
            delete(api::handlers::uploads::discard_upload),
        )
        .route(
            "/uploads/:id/requeue",
            post(api::handlers::uploads::requeue_upload),
        )
        .route("/sync", post(api::handlers::sync::trigger_sync))
        .route("/events", get(api::handlers::events::stream_events))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024, // multipart overhead
        ))
        .with_state(state)
}
