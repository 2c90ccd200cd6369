use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use qdrive_sync::config::SyncConfig;
use qdrive_sync::infrastructure::{database, storage};
use qdrive_sync::models::{FileBlob, NewUpload};
use qdrive_sync::services::connectivity::{HttpProbe, LinkState, LinkWatcher};
use qdrive_sync::services::events::SyncEvent;
use qdrive_sync::services::orchestrator::DrainOutcome;
use qdrive_sync::services::queue_store::{QueueStore, RemoveOutcome};
use qdrive_sync::services::remote::bucket_upload::BucketUploadService;
use qdrive_sync::services::remote::records::HttpRecordStore;
use qdrive_sync::services::upload_client::UploadOutcome;
use qdrive_sync::{AppState, create_app};
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the sync agent: link watcher, connectivity monitor, drain loop and local API
    Run,

    /// Upload a file, or queue it when the remote cannot be reached
    Enqueue {
        file: PathBuf,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        account: String,

        /// Originating view, reported back when the upload syncs
        #[arg(long, default_value = "")]
        path: String,

        /// Sniffed from the content when omitted
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Show queued uploads in insertion order
    List,

    /// Probe the remote and drain the queue once
    Sync,

    /// Make a parked upload eligible again
    Requeue { id: i64 },

    /// Drop a queued upload without uploading it
    Discard { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qdrive_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env();
    let db = database::setup_database(&config.database_url).await?;

    match args.command {
        Command::Run => run(db, config).await,
        Command::Enqueue {
            file,
            owner,
            account,
            path,
            content_type,
        } => enqueue(db, config, file, owner, account, path, content_type).await,
        Command::List => list(QueueStore::new(db)).await,
        Command::Sync => sync_once(db, config).await,
        Command::Requeue { id } => {
            if QueueStore::new(db).requeue(id).await? {
                info!("🔁 Upload {} is pending again", id);
            } else {
                warn!("Upload {} not found", id);
            }
            Ok(())
        }
        Command::Discard { id } => {
            let state = build_state(db, config).await?;
            state.monitor.check_now().await;
            match state.dispatcher.discard(id).await? {
                RemoveOutcome::Removed => info!("🗑️  Upload {} discarded", id),
                RemoveOutcome::NotFound => warn!("Upload {} not found", id),
            }
            Ok(())
        }
    }
}

async fn build_state(db: DatabaseConnection, config: SyncConfig) -> anyhow::Result<AppState> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("qdrive-sync/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let objects = storage::setup_storage(&config.remote).await?;
    let records = Arc::new(HttpRecordStore::from_config(http.clone(), &config.remote)?);
    let remote = Arc::new(BucketUploadService::new(
        objects,
        records,
        config.remote.public_file_base_url.clone(),
    ));

    let probe_url = Url::parse(&config.probe_url)
        .with_context(|| format!("invalid PROBE_URL {}", config.probe_url))?;
    let probe = Arc::new(HttpProbe::new(http, probe_url, config.probe_timeout));

    Ok(AppState::new(db, remote, probe, config))
}

async fn run(db: DatabaseConnection, config: SyncConfig) -> anyhow::Result<()> {
    info!("🚀 Starting qdrive sync agent...");
    info!(
        "🛡️  Max Size={}MB, Max Attempts={}, Drain Concurrency={}",
        config.max_file_size / 1024 / 1024,
        config.max_attempts,
        config.drain_concurrency
    );

    let state = build_state(db, config.clone()).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let (link_tx, link_rx) = tokio::sync::watch::channel(LinkState::Down);
    let mut handles = Vec::new();

    let probe_url = Url::parse(&config.probe_url)?;
    let watcher = LinkWatcher::for_url(&probe_url, config.link_poll_interval, config.probe_timeout)?;
    handles.push(tokio::spawn(watcher.run(link_tx, shutdown_rx.clone())));

    let monitor = state.monitor.clone();
    let monitor_shutdown = shutdown_rx.clone();
    let recheck = config.link_poll_interval;
    handles.push(tokio::spawn(async move {
        monitor.run(link_rx, monitor_shutdown, recheck).await;
    }));

    let orchestrator = state.orchestrator.clone();
    let restored = state.monitor.subscribe_restored();
    let orchestrator_shutdown = shutdown_rx.clone();
    let resync = config.resync_interval;
    handles.push(tokio::spawn(async move {
        orchestrator.run(restored, orchestrator_shutdown, resync).await;
    }));

    // User-facing notices
    state.events.spawn_listener(|event| match event {
        SyncEvent::UploadQueued { name, .. } => {
            info!("📴 Offline: {} saved locally, will sync when back online", name)
        }
        SyncEvent::UploadSynced { name, .. } => info!("☁️  Synced {}", name),
        SyncEvent::UploadFailed {
            name,
            error,
            parked: true,
            ..
        } => warn!("⚠️ {} needs attention: {}", name, error),
        SyncEvent::UploadFailed { .. } => {}
        SyncEvent::UploadsFlushed => info!("✅ All pending uploads synced"),
    });

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;

    info!("✅ Local API listening on: http://{}", config.listen_addr);
    info!("📖 Swagger UI documentation: http://{}/swagger-ui", config.listen_addr);

    let mut server_shutdown = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
        {
            error!("❌ Server runtime error: {}", e);
        }
    }));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    info!("🛑 Shutting down sync agent...");
    for handle in handles {
        let _ = handle.await;
    }

    info!("👋 Sync agent exited cleanly.");
    Ok(())
}

async fn enqueue(
    db: DatabaseConnection,
    config: SyncConfig,
    file: PathBuf,
    owner: String,
    account: String,
    path: String,
    content_type: Option<String>,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    let state = build_state(db, config).await?;
    state.monitor.check_now().await;

    let upload = NewUpload::new(
        FileBlob::detect(name, content_type, bytes.into()),
        owner,
        account,
        path,
    );

    match state.upload_client.upload(upload).await? {
        UploadOutcome::Uploaded(record) => info!("☁️  Uploaded as {}", record.id),
        UploadOutcome::SavedOffline(enqueued) => {
            info!("💾 Saved offline as queue entry {}", enqueued.id)
        }
    }
    Ok(())
}

async fn list(store: QueueStore) -> anyhow::Result<()> {
    let uploads = store.list_all().await?;
    if uploads.is_empty() {
        info!("📭 Queue is empty");
        return Ok(());
    }
    for upload in uploads {
        println!("{}", serde_json::to_string(&upload.summary())?);
    }
    Ok(())
}

async fn sync_once(db: DatabaseConnection, config: SyncConfig) -> anyhow::Result<()> {
    let state = build_state(db, config).await?;

    if !state.monitor.check_now().await {
        warn!("🌐 Remote not reachable, nothing synced");
        return Ok(());
    }

    match state.orchestrator.drain().await? {
        DrainOutcome::Completed(report) => println!("{}", serde_json::to_string(&report)?),
        DrainOutcome::AlreadyRunning => warn!("Drain already running"),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
