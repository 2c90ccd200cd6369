use std::env;
use std::time::Duration;

/// Runtime configuration for the offline upload queue and its sync loop
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// SeaORM connection string for the durable queue (default: "sqlite://qdrive-offline.db?mode=rwc")
    pub database_url: String,

    /// Same-origin endpoint hit by the reachability probe
    pub probe_url: String,

    /// Delay between an interface-level "up" signal and the first probe (default: 2 s)
    pub settle_delay: Duration,

    /// Timeout applied to a single probe request (default: 3 s)
    pub probe_timeout: Duration,

    /// How often the link watcher re-checks the interface (default: 5 s)
    pub link_poll_interval: Duration,

    /// Periodic drain while online, picks up records whose backoff expired (default: 60 s)
    pub resync_interval: Duration,

    /// Attempts before a record is parked (default: 8)
    pub max_attempts: u32,

    /// First retry delay, doubled per attempt (default: 5 s)
    pub backoff_base: Duration,

    /// Retry delay ceiling (default: 15 min)
    pub backoff_max: Duration,

    /// Dispatches in flight during one drain (default: 1, strictly sequential)
    pub drain_concurrency: usize,

    /// Maximum file size in bytes (default: 50 MB)
    pub max_file_size: usize,

    /// Lifecycle events buffered per subscriber before it lags (default: 64)
    pub event_capacity: usize,

    /// Bind address of the local control API (default: "127.0.0.1:4600")
    pub listen_addr: String,

    pub remote: RemoteConfig,
}

/// Endpoints and credentials of the managed storage backend
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    pub object_endpoint: Option<String>,
    pub object_access_key: Option<String>,
    pub object_secret_key: Option<String>,
    pub bucket: String,

    pub records_api_url: Option<String>,
    pub records_project_id: Option<String>,
    pub records_api_key: Option<String>,
    pub records_database_id: String,
    pub records_collection_id: String,

    /// Prefix used to build the public URL stored on each file document
    pub public_file_base_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://qdrive-offline.db?mode=rwc".to_string(),
            probe_url: "http://127.0.0.1:3000/".to_string(),
            settle_delay: Duration::from_millis(2000),
            probe_timeout: Duration::from_millis(3000),
            link_poll_interval: Duration::from_secs(5),
            resync_interval: Duration::from_secs(60),
            max_attempts: 8,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(15 * 60),
            drain_concurrency: 1,
            max_file_size: 50 * 1024 * 1024, // 50 MB
            event_capacity: 64,
            listen_addr: "127.0.0.1:4600".to_string(),
            remote: RemoteConfig {
                bucket: "files".to_string(),
                records_database_id: "qdrive".to_string(),
                records_collection_id: "files".to_string(),
                public_file_base_url: "http://127.0.0.1:9000/files".to_string(),
                ..RemoteConfig::default()
            },
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl SyncConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_url: env::var("QUEUE_DATABASE_URL").unwrap_or(default.database_url),

            probe_url: env::var("PROBE_URL").unwrap_or(default.probe_url),

            settle_delay: parse_env("SETTLE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.settle_delay),

            probe_timeout: parse_env("PROBE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.probe_timeout),

            link_poll_interval: parse_env("LINK_POLL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.link_poll_interval),

            resync_interval: parse_env("RESYNC_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.resync_interval),

            max_attempts: parse_env("MAX_UPLOAD_ATTEMPTS").unwrap_or(default.max_attempts),

            backoff_base: parse_env("BACKOFF_BASE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.backoff_base),

            backoff_max: parse_env("BACKOFF_MAX_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.backoff_max),

            drain_concurrency: parse_env::<usize>("DRAIN_CONCURRENCY")
                .map(|n| n.max(1))
                .unwrap_or(default.drain_concurrency),

            max_file_size: parse_env("MAX_FILE_SIZE").unwrap_or(default.max_file_size),

            event_capacity: parse_env::<usize>("EVENT_CAPACITY")
                .map(|n| n.max(1))
                .unwrap_or(default.event_capacity),

            listen_addr: env::var("LISTEN_ADDR").unwrap_or(default.listen_addr),

            remote: RemoteConfig {
                object_endpoint: env::var("MINIO_ENDPOINT").ok(),
                object_access_key: env::var("MINIO_ACCESS_KEY").ok(),
                object_secret_key: env::var("MINIO_SECRET_KEY").ok(),
                bucket: env::var("MINIO_BUCKET").unwrap_or(default.remote.bucket),
                records_api_url: env::var("RECORDS_API_URL").ok(),
                records_project_id: env::var("RECORDS_PROJECT_ID").ok(),
                records_api_key: env::var("RECORDS_API_KEY").ok(),
                records_database_id: env::var("RECORDS_DATABASE_ID")
                    .unwrap_or(default.remote.records_database_id),
                records_collection_id: env::var("RECORDS_COLLECTION_ID")
                    .unwrap_or(default.remote.records_collection_id),
                public_file_base_url: env::var("PUBLIC_FILE_BASE_URL")
                    .unwrap_or(default.remote.public_file_base_url),
            },
        }
    }

    /// Create config for development (in-memory queue, fast retries, no settle delay)
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            settle_delay: Duration::ZERO,
            probe_timeout: Duration::from_millis(500),
            link_poll_interval: Duration::from_millis(200),
            resync_interval: Duration::from_secs(1),
            max_attempts: 3,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.drain_concurrency, 1);
        assert_eq!(config.max_attempts, 8);
        assert_eq!(config.remote.bucket, "files");
    }

    #[test]
    fn test_development_config() {
        let config = SyncConfig::development();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.backoff_base, Duration::ZERO);
        assert_eq!(config.max_attempts, 3);
    }
}
