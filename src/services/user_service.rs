use crate::api::error::AppError;
use crate::entities::{prelude::*, sea_orm_active_enums::Role, users};
use crate::utils::password::hash_secret;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
    sea_query::Expr,
};
use serde::Serialize;
use utoipa::ToSchema;

/// A user record with its password hash and refresh-token hash stripped.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for UserProfile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<users::Model, AppError> {
        let email = normalize_email(email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_secret(password)?;
        let now = Utc::now();

        let user = users::ActiveModel {
            email: Set(email),
            password_hash: Set(password_hash),
            name: Set(name),
            role: Set(Role::User),
            hashed_refresh_token: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        user.insert(&self.db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Email is already registered".to_string())
            }
            _ => AppError::Database(e),
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, AppError> {
        Ok(Users::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>, AppError> {
        Ok(Users::find_by_id(id).one(&self.db).await?)
    }

    /// Overwrites (or clears, with `None`) the stored refresh-token hash.
    pub async fn set_refresh_token_hash(
        &self,
        id: i32,
        hash: Option<String>,
    ) -> Result<(), AppError> {
        let mut update = Users::update_many()
            .col_expr(users::Column::HashedRefreshToken, Expr::value(hash.clone()))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id));

        if hash.is_none() {
            update = update.filter(users::Column::HashedRefreshToken.is_not_null());
        }

        update.exec(&self.db).await?;
        Ok(())
    }

    pub async fn set_role(&self, email: &str, role: Role) -> Result<users::Model, AppError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", email)))?;

        let mut active: users::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }
}
