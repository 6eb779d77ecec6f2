use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub unique_code: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(default_value = 1)]
    pub version: i32,
    #[sea_orm(default_value = true)]
    pub is_active: bool,
    /// Ordered list of field definitions, `None` until a structure is attached.
    pub structure_definition: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::form_instances::Entity")]
    FormInstances,
}

impl Related<super::form_instances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormInstances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
