use super::sea_orm_active_enums::FormStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_instances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub data: Json,
    pub status: FormStatus,
    pub template_id: i32,
    pub owner_user_id: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::form_templates::Entity",
        from = "Column::TemplateId",
        to = "super::form_templates::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    FormTemplates,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerUserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::uploaded_files::Entity")]
    UploadedFiles,
}

impl Related<super::form_templates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormTemplates.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::uploaded_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UploadedFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
