use crate::utils::validation::validate_storage_key;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};

/// Byte storage addressed by opaque keys. Database rows only ever hold keys.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()>;
    async fn get_file(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete_file(&self, key: &str) -> Result<()>;
    async fn file_exists(&self, key: &str) -> Result<bool>;
}

/// Files under a directory on the local filesystem.
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        validate_storage_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("🗑️  Deleted local file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Attempted to delete non-existent file {}", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }

    async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        let data = res.body.collect().await?.to_vec();
        Ok(data)
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path()).await.unwrap();

        storage
            .upload_file("user_1/a.txt", b"hello".to_vec())
            .await
            .unwrap();
        assert!(storage.file_exists("user_1/a.txt").await.unwrap());
        assert_eq!(storage.get_file("user_1/a.txt").await.unwrap(), b"hello");

        storage.delete_file("user_1/a.txt").await.unwrap();
        assert!(!storage.file_exists("user_1/a.txt").await.unwrap());
        // Deleting twice is not an error
        storage.delete_file("user_1/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path()).await.unwrap();
        assert!(
            storage
                .upload_file("../escape.txt", b"x".to_vec())
                .await
                .is_err()
        );
        assert!(storage.get_file("/etc/passwd").await.is_err());
    }
}
