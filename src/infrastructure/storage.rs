use crate::services::storage::{LocalStorageService, S3StorageService, StorageService};
use anyhow::Context;
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::info;

/// Picks the storage backend from `STORAGE_BACKEND` (`local` by default).
pub async fn setup_storage() -> anyhow::Result<Arc<dyn StorageService>> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string());

    match backend.to_lowercase().as_str() {
        "local" => {
            let root = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
            info!("💾 Local Storage: {}", root);
            Ok(Arc::new(LocalStorageService::new(root).await?))
        }
        "s3" => Ok(Arc::new(setup_s3().await?)),
        other => anyhow::bail!("Unknown STORAGE_BACKEND '{}' (expected local or s3)", other),
    }
}

fn s3_var(name: &str) -> anyhow::Result<String> {
    env::var(format!("S3_{}", name))
        .or_else(|_| env::var(format!("MINIO_{}", name)))
        .with_context(|| format!("S3_{} (or MINIO_{}) must be set", name, name))
}

async fn setup_s3() -> anyhow::Result<S3StorageService> {
    let endpoint_url = s3_var("ENDPOINT")?;
    let access_key = s3_var("ACCESS_KEY")?;
    let secret_key = s3_var("SECRET_KEY")?;
    let bucket = s3_var("BUCKET")?;
    let region = s3_var("REGION").unwrap_or_else(|_| "us-east-1".to_string());

    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(region))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    // Ensure bucket exists
    match s3_client.head_bucket().bucket(&bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
        Err(_) => {
            info!("🪣 Bucket '{}' not found, creating...", bucket);
            s3_client
                .create_bucket()
                .bucket(&bucket)
                .send()
                .await
                .with_context(|| format!("Failed to create bucket '{}'", bucket))?;
            info!("✅ Bucket '{}' created successfully", bucket);
        }
    }

    Ok(S3StorageService::new(s3_client, bucket))
}
