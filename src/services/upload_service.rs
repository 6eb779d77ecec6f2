use crate::api::error::AppError;
use crate::config::SecurityConfig;
use crate::entities::{prelude::*, uploaded_files};
use crate::models::FileReference;
use crate::services::storage::StorageService;
use crate::utils::validation::{base_filename, build_storage_key, resolve_mime_type, validate_file_size};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

/// Puts uploaded bytes into storage and serves them back to their owner.
///
/// Uploads are not recorded in the database here; a row is only created
/// once the returned reference is submitted with a form instance.
pub struct UploadService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    config: SecurityConfig,
}

impl UploadService {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        config: SecurityConfig,
    ) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    pub async fn store(
        &self,
        user_id: i32,
        filename: &str,
        declared_mime: Option<&str>,
        data: Vec<u8>,
    ) -> Result<FileReference, AppError> {
        validate_file_size(data.len(), self.config.max_file_size)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let filename = base_filename(filename).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let storage_key =
            build_storage_key(user_id, &filename).map_err(|e| AppError::BadRequest(e.to_string()))?;

        let header_len = data.len().min(512);
        let mime_type = resolve_mime_type(declared_mime, &data[..header_len]);
        let size = data.len() as i64;

        self.storage
            .upload_file(&storage_key, data)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store {}: {}", storage_key, e);
                AppError::Internal("Failed to store file".to_string())
            })?;

        tracing::info!(
            "📦 Stored {} ({} bytes, {}) for user {}",
            storage_key,
            size,
            mime_type,
            user_id
        );

        Ok(FileReference {
            storage_key,
            filename,
            mime_type: Some(mime_type),
            size: Some(size),
        })
    }

    /// Loads a persisted file for its owner.
    pub async fn fetch_owned(
        &self,
        file_id: i32,
        user_id: i32,
    ) -> Result<(uploaded_files::Model, Vec<u8>), AppError> {
        let file = UploadedFiles::find_by_id(file_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File with ID {} not found", file_id)))?;

        if file.owner_user_id != user_id {
            return Err(AppError::Forbidden(
                "You do not have permission to access this file".to_string(),
            ));
        }

        let exists = self
            .storage
            .file_exists(&file.storage_key)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if !exists {
            tracing::warn!(
                "File {} references missing object {}",
                file.id,
                file.storage_key
            );
            return Err(AppError::NotFound("File content is no longer available".to_string()));
        }

        let data = self
            .storage
            .get_file(&file.storage_key)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok((file, data))
    }
}
