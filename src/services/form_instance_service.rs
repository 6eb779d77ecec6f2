use crate::api::error::AppError;
use crate::entities::{
    form_instances, form_templates, prelude::*, sea_orm_active_enums::FormStatus, uploaded_files,
};
use crate::services::form_template_service::FormTemplateResponse;
use crate::services::form_validator::{
    check_required_fields, file_field_names, parse_structure, partition,
};
use crate::utils::validation::{key_belongs_to_user, validate_storage_key};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormInstanceRequest {
    pub template_id: i32,
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
    pub status: Option<FormStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormInstanceRequest {
    #[schema(value_type = Option<Object>)]
    pub data: Option<Map<String, Value>>,
    pub status: Option<FormStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileResponse {
    pub id: i32,
    pub filename: String,
    pub storage_key: String,
    pub mime_type: String,
    pub size: i64,
    pub field_name: String,
    pub owner_user_id: i32,
    pub form_instance_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<uploaded_files::Model> for UploadedFileResponse {
    fn from(file: uploaded_files::Model) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            storage_key: file.storage_key,
            mime_type: file.mime_type,
            size: file.size,
            field_name: file.field_name,
            owner_user_id: file.owner_user_id,
            form_instance_id: file.form_instance_id,
            created_at: file.created_at,
        }
    }
}

/// An instance with its template and attached files.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormInstanceResponse {
    pub id: i32,
    #[schema(value_type = Object)]
    pub data: Value,
    pub status: FormStatus,
    pub template_id: i32,
    pub owner_user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub template: Option<FormTemplateResponse>,
    pub uploaded_files: Vec<UploadedFileResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: i32,
    pub name: String,
    pub unique_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: i32,
    pub filename: String,
    pub field_name: String,
}

/// List entry for the owner's instances.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormInstanceSummary {
    pub id: i32,
    #[schema(value_type = Object)]
    pub data: Value,
    pub status: FormStatus,
    pub template_id: i32,
    pub owner_user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub template: Option<TemplateSummary>,
    pub uploaded_files: Vec<FileSummary>,
}

fn build_response(
    instance: form_instances::Model,
    template: Option<form_templates::Model>,
    files: Vec<uploaded_files::Model>,
) -> Result<FormInstanceResponse, AppError> {
    Ok(FormInstanceResponse {
        id: instance.id,
        data: instance.data,
        status: instance.status,
        template_id: instance.template_id,
        owner_user_id: instance.owner_user_id,
        created_at: instance.created_at,
        updated_at: instance.updated_at,
        template: template.map(FormTemplateResponse::try_from).transpose()?,
        uploaded_files: files.into_iter().map(UploadedFileResponse::from).collect(),
    })
}

#[derive(Clone)]
pub struct FormInstanceService {
    db: DatabaseConnection,
}

impl FormInstanceService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Checks `data` against the template's required fields.
    ///
    /// A template that does not exist or has no structure yet imposes no
    /// constraints.
    pub async fn validate(&self, template_id: i32, data: &Map<String, Value>) -> Result<(), AppError> {
        let template = FormTemplates::find_by_id(template_id).one(&self.db).await?;
        match template {
            Some(template) => Self::validate_against(&template, data),
            None => {
                warn!("Template {} not found, skipping validation", template_id);
                Ok(())
            }
        }
    }

    fn validate_against(
        template: &form_templates::Model,
        data: &Map<String, Value>,
    ) -> Result<(), AppError> {
        match parse_structure(template.structure_definition.as_ref())? {
            Some(structure) => check_required_fields(&structure, data),
            None => {
                warn!(
                    "Template {} has no structure yet, skipping validation",
                    template.id
                );
                Ok(())
            }
        }
    }

    /// Creates the instance and its file rows in a single transaction.
    pub async fn create_instance(
        &self,
        req: CreateFormInstanceRequest,
        owner_id: i32,
    ) -> Result<FormInstanceResponse, AppError> {
        let template = FormTemplates::find_by_id(req.template_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Template with ID {} not found", req.template_id))
            })?;

        Self::validate_against(&template, &req.data)?;

        let structure = parse_structure(template.structure_definition.as_ref())?.unwrap_or_default();
        let parts = partition(&structure, req.data);

        for (field_name, reference) in &parts.files {
            validate_storage_key(&reference.storage_key)
                .map_err(|e| AppError::BadRequest(format!("Field '{}': {}", field_name, e)))?;
            if !key_belongs_to_user(&reference.storage_key, owner_id) {
                warn!(
                    "User {} referenced foreign storage key {} in field {}",
                    owner_id, reference.storage_key, field_name
                );
                return Err(AppError::Forbidden(format!(
                    "Field '{}' references a file you did not upload",
                    field_name
                )));
            }
        }

        let now = Utc::now();

        let txn = self.db.begin().await?;

        let instance = form_instances::ActiveModel {
            data: Set(Value::Object(parts.scalar)),
            status: Set(req.status.unwrap_or_default()),
            template_id: Set(template.id),
            owner_user_id: Set(owner_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut files = Vec::with_capacity(parts.files.len());
        for (field_name, reference) in parts.files {
            let file = uploaded_files::ActiveModel {
                filename: Set(reference.filename),
                storage_key: Set(reference.storage_key),
                mime_type: Set(reference
                    .mime_type
                    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())),
                size: Set(reference.size.unwrap_or(0)),
                field_name: Set(field_name),
                owner_user_id: Set(owner_id),
                form_instance_id: Set(Some(instance.id)),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            files.push(file);
        }

        txn.commit().await?;

        info!(
            "📨 User {} created instance {} of template {} with {} file(s)",
            owner_id,
            instance.id,
            template.id,
            files.len()
        );

        build_response(instance, Some(template), files)
    }

    pub async fn find_all_for_user(
        &self,
        owner_id: i32,
    ) -> Result<Vec<FormInstanceSummary>, AppError> {
        let rows = FormInstances::find()
            .filter(form_instances::Column::OwnerUserId.eq(owner_id))
            .order_by_desc(form_instances::Column::CreatedAt)
            .order_by_desc(form_instances::Column::Id)
            .find_also_related(FormTemplates)
            .all(&self.db)
            .await?;

        let instance_ids: Vec<i32> = rows.iter().map(|(i, _)| i.id).collect();
        let mut files_by_instance: HashMap<i32, Vec<FileSummary>> = HashMap::new();
        if !instance_ids.is_empty() {
            let files = UploadedFiles::find()
                .filter(uploaded_files::Column::FormInstanceId.is_in(instance_ids))
                .order_by_asc(uploaded_files::Column::Id)
                .all(&self.db)
                .await?;
            for file in files {
                if let Some(instance_id) = file.form_instance_id {
                    files_by_instance
                        .entry(instance_id)
                        .or_default()
                        .push(FileSummary {
                            id: file.id,
                            filename: file.filename,
                            field_name: file.field_name,
                        });
                }
            }
        }

        Ok(rows
            .into_iter()
            .map(|(instance, template)| FormInstanceSummary {
                uploaded_files: files_by_instance.remove(&instance.id).unwrap_or_default(),
                template: template.map(|t| TemplateSummary {
                    id: t.id,
                    name: t.name,
                    unique_code: t.unique_code,
                }),
                id: instance.id,
                data: instance.data,
                status: instance.status,
                template_id: instance.template_id,
                owner_user_id: instance.owner_user_id,
                created_at: instance.created_at,
                updated_at: instance.updated_at,
            })
            .collect())
    }

    async fn load_owned(
        &self,
        id: i32,
        owner_id: i32,
    ) -> Result<(form_instances::Model, Option<form_templates::Model>), AppError> {
        let (instance, template) = FormInstances::find_by_id(id)
            .find_also_related(FormTemplates)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instance with ID {} not found", id)))?;

        if instance.owner_user_id != owner_id {
            return Err(AppError::Forbidden(
                "You do not have permission to access this instance".to_string(),
            ));
        }

        Ok((instance, template))
    }

    async fn files_of(&self, instance_id: i32) -> Result<Vec<uploaded_files::Model>, AppError> {
        Ok(UploadedFiles::find()
            .filter(uploaded_files::Column::FormInstanceId.eq(instance_id))
            .order_by_asc(uploaded_files::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn find_one_for_user(
        &self,
        id: i32,
        owner_id: i32,
    ) -> Result<FormInstanceResponse, AppError> {
        let (instance, template) = self.load_owned(id, owner_id).await?;
        let files = self.files_of(instance.id).await?;
        build_response(instance, template, files)
    }

    /// Updates a draft owned by `owner_id`.
    ///
    /// Only the scalar part of `data` is persisted; file references found in
    /// it are not written to the uploaded files yet. `status` is stored as
    /// given.
    pub async fn update_instance(
        &self,
        id: i32,
        req: UpdateFormInstanceRequest,
        owner_id: i32,
    ) -> Result<FormInstanceResponse, AppError> {
        let (instance, template) = self.load_owned(id, owner_id).await?;

        if !instance.status.is_editable() {
            return Err(AppError::Forbidden(format!(
                "A form in status '{}' cannot be edited",
                instance.status.label()
            )));
        }

        let current_status = instance.status;
        let mut active: form_instances::ActiveModel = instance.into();

        if let Some(data) = req.data {
            let template = template.as_ref().ok_or_else(|| {
                AppError::Internal(format!("Instance {} has no template to validate against", id))
            })?;
            let structure =
                parse_structure(template.structure_definition.as_ref())?.unwrap_or_default();
            let mut parts = partition(&structure, data);
            let file_fields = file_field_names(&structure);
            parts.scalar.retain(|key, _| !file_fields.contains(key.as_str()));
            if !parts.files.is_empty() {
                debug!(
                    "Instance {} update carried file references for {:?}; not persisted",
                    id,
                    parts.files.keys().collect::<Vec<_>>()
                );
            }
            active.data = Set(Value::Object(parts.scalar));
        }

        if let Some(status) = req.status {
            if !current_status.can_transition_to(status) {
                warn!(
                    "Instance {} moved {} -> {} outside the review workflow",
                    id,
                    current_status.label(),
                    status.label()
                );
            }
            active.status = Set(status);
        }

        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;
        let files = self.files_of(updated.id).await?;

        build_response(updated, template, files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::run_migrations;
    use sea_orm::Database;
    use serde_json::json;

    async fn service() -> FormInstanceService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        FormInstanceService::new(db)
    }

    #[tokio::test]
    async fn test_validate_skips_unknown_template() {
        let service = service().await;
        let data = json!({}).as_object().cloned().unwrap();
        assert!(service.validate(42, &data).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_uses_stored_structure() {
        let service = service().await;
        let now = Utc::now();
        let template = form_templates::ActiveModel {
            unique_code: Set("T".to_string()),
            name: Set("T".to_string()),
            description: Set(None),
            version: Set(1),
            is_active: Set(true),
            structure_definition: Set(Some(json!([
                { "id": "1", "order": 0, "name": "title", "label": "Title", "type": "text", "required": true }
            ]))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&service.db)
        .await
        .unwrap();

        let empty = json!({}).as_object().cloned().unwrap();
        assert!(matches!(
            service.validate(template.id, &empty).await,
            Err(AppError::BadRequest(_))
        ));

        let filled = json!({ "title": "x" }).as_object().cloned().unwrap();
        assert!(service.validate(template.id, &filled).await.is_ok());
    }
}
