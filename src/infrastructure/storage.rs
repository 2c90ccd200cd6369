use crate::config::RemoteConfig;
use crate::services::remote::object_store::S3ObjectStore;
use anyhow::Context;
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &RemoteConfig) -> anyhow::Result<Arc<S3ObjectStore>> {
    let endpoint_url = config
        .object_endpoint
        .clone()
        .context("MINIO_ENDPOINT must be set")?;
    let access_key = config
        .object_access_key
        .clone()
        .context("MINIO_ACCESS_KEY must be set")?;
    let secret_key = config
        .object_secret_key
        .clone()
        .context("MINIO_SECRET_KEY must be set")?;
    let bucket = config.bucket.clone();

    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new("us-east-1"))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    // The bucket may be unreachable while offline; uploads will classify that later
    match s3_client.head_bucket().bucket(&bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
        Err(e) => tracing::warn!("⚠️ Bucket '{}' not reachable yet: {}", bucket, e),
    }

    Ok(Arc::new(S3ObjectStore::new(s3_client, bucket)))
}
