use super::sea_orm_active_enums::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text", nullable)]
    pub hashed_refresh_token: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::form_instances::Entity")]
    FormInstances,
    #[sea_orm(has_many = "super::uploaded_files::Entity")]
    UploadedFiles,
}

impl Related<super::form_instances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormInstances.def()
    }
}

impl Related<super::uploaded_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UploadedFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
