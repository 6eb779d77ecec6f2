use crate::entities::{form_instances, form_templates, uploaded_files, users};
use anyhow::Context;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema,
};
use std::env;
use std::time::Duration;
use tracing::info;

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    info!("📂 Database: {}", redact_url(&db_url));

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;
    crate::infrastructure::seed::seed_admin_from_env(&db).await?;

    Ok(db)
}

/// Brings the schema up to date: SQL migrations on PostgreSQL, tables
/// derived from the entities everywhere else.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let backend = db.get_database_backend();

    if backend == DatabaseBackend::Postgres {
        info!("🔄 Running SQLx migrations for PostgreSQL...");
        let pool = db.get_postgres_connection_pool();
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .context("PostgreSQL migration failed")?;
        return Ok(());
    }

    info!("🔄 Creating tables from entities...");
    let schema = Schema::new(backend);

    // Parents before children so foreign keys resolve.
    let stmts = vec![
        schema
            .create_table_from_entity(users::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(form_templates::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(form_instances::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(uploaded_files::Entity)
            .if_not_exists()
            .to_owned(),
    ];

    for stmt in stmts {
        db.execute(backend.build(&stmt)).await?;
    }

    Ok(())
}

fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_hides_credentials() {
        assert_eq!(
            redact_url("postgres://app:hunter2@db:5432/forms"),
            "postgres://***@db:5432/forms"
        );
        assert_eq!(redact_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_run_migrations_is_repeatable_on_sqlite() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        run_migrations(&db).await.unwrap();
    }
}
