use crate::api::error::AppError;
use crate::entities::{form_templates, prelude::*};
use crate::models::FieldDefinition;
use crate::services::form_validator::{check_unique_fields, parse_structure};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormTemplateRequest {
    #[validate(length(min = 1, max = 50, message = "Unique code must be 1-50 characters"))]
    pub unique_code: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStructureRequest {
    #[validate(nested)]
    pub structure_definition: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplateResponse {
    pub id: i32,
    pub unique_code: String,
    pub name: String,
    pub description: Option<String>,
    pub version: i32,
    pub is_active: bool,
    pub structure_definition: Option<Vec<FieldDefinition>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<form_templates::Model> for FormTemplateResponse {
    type Error = AppError;

    fn try_from(template: form_templates::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            structure_definition: parse_structure(template.structure_definition.as_ref())?,
            id: template.id,
            unique_code: template.unique_code,
            name: template.name,
            description: template.description,
            version: template.version,
            is_active: template.is_active,
            created_at: template.created_at,
            updated_at: template.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct FormTemplateService {
    db: DatabaseConnection,
}

impl FormTemplateService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        req: CreateFormTemplateRequest,
    ) -> Result<form_templates::Model, AppError> {
        req.validate()?;

        let existing = FormTemplates::find()
            .filter(form_templates::Column::UniqueCode.eq(&req.unique_code))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "A template with code {} already exists",
                req.unique_code
            )));
        }

        let now = Utc::now();
        let template = form_templates::ActiveModel {
            unique_code: Set(req.unique_code),
            name: Set(req.name),
            description: Set(req.description),
            version: Set(1),
            is_active: Set(true),
            structure_definition: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let template = template.insert(&self.db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("A template with this code already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

        tracing::info!("📝 Created form template {} ({})", template.id, template.unique_code);
        Ok(template)
    }

    pub async fn find_all(&self) -> Result<Vec<form_templates::Model>, AppError> {
        Ok(FormTemplates::find()
            .order_by_desc(form_templates::Column::CreatedAt)
            .order_by_desc(form_templates::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn find_one(&self, id: i32) -> Result<form_templates::Model, AppError> {
        FormTemplates::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template with ID {} not found", id)))
    }

    /// Replaces the template's structure after checking field uniqueness.
    pub async fn update_structure(
        &self,
        id: i32,
        req: UpdateStructureRequest,
    ) -> Result<form_templates::Model, AppError> {
        req.validate()?;
        check_unique_fields(&req.structure_definition)?;

        let template = self.find_one(id).await?;

        let structure = serde_json::to_value(&req.structure_definition)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let mut active: form_templates::ActiveModel = template.into();
        active.structure_definition = Set(Some(structure));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        tracing::info!(
            "🧩 Template {} structure set to {} fields",
            updated.id,
            req.structure_definition.len()
        );
        Ok(updated)
    }
}
