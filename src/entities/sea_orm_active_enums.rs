use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "doc_builder")]
    DocBuilder,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::DocBuilder => "doc_builder",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "doc_builder" => Some(Role::DocBuilder),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Lifecycle of a submitted form.
///
/// `Draft -> Submitted -> {Approved | Rejected} -> Signed -> Archived`, and a
/// draft may be archived directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum FormStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "Submitted")]
    Submitted,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
    #[sea_orm(string_value = "Signed")]
    Signed,
    #[sea_orm(string_value = "Archived")]
    Archived,
}

impl Default for FormStatus {
    fn default() -> Self {
        FormStatus::Draft
    }
}

impl FormStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FormStatus::Draft => "Draft",
            FormStatus::Submitted => "Submitted",
            FormStatus::Approved => "Approved",
            FormStatus::Rejected => "Rejected",
            FormStatus::Signed => "Signed",
            FormStatus::Archived => "Archived",
        }
    }

    /// Only drafts accept edits to their data.
    pub fn is_editable(&self) -> bool {
        matches!(self, FormStatus::Draft)
    }

    pub fn can_transition_to(&self, next: FormStatus) -> bool {
        use FormStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Draft, Archived)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Approved, Signed)
                | (Rejected, Signed)
                | (Signed, Archived)
        )
    }
}
