use crate::entities::sea_orm_active_enums::Role;
use crate::services::user_service::UserService;
use sea_orm::DatabaseConnection;
use std::env;
use tracing::info;

/// Creates (or promotes) an admin account when `ADMIN_EMAIL` and
/// `ADMIN_PASSWORD` are both set. A no-op otherwise.
pub async fn seed_admin_from_env(db: &DatabaseConnection) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) else {
        return Ok(());
    };

    seed_admin(db, &email, &password).await
}

pub async fn seed_admin(db: &DatabaseConnection, email: &str, password: &str) -> anyhow::Result<()> {
    let users = UserService::new(db.clone());

    if users.find_by_email(email).await?.is_none() {
        info!("🌱 Seeding admin account {}", email);
        users.create_user(email, password, None).await?;
    }

    let admin = users.set_role(email, Role::Admin).await?;
    info!("🛡️  User {} has role {}", admin.email, admin.role.as_str());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::run_migrations;
    use sea_orm::Database;

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();

        seed_admin(&db, "root@example.com", "correct horse").await.unwrap();
        seed_admin(&db, "root@example.com", "correct horse").await.unwrap();

        let user = UserService::new(db)
            .find_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, Role::Admin);
    }
}
