use clap::Parser;
use dotenvy::dotenv;
use form_builder_backend::entities::sea_orm_active_enums::Role;
use form_builder_backend::infrastructure::database;
use form_builder_backend::services::user_service::UserService;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Change the role of an existing user.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Email of the user to update
    email: String,

    /// New role: user, doc_builder or admin
    role: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "set_role=info,form_builder_backend=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(role) = Role::parse(&args.role) else {
        error!(
            "❌ Unknown role '{}'. Expected one of: user, doc_builder, admin",
            args.role
        );
        std::process::exit(2);
    };

    info!("🔌 Connecting to database...");
    let db = database::setup_database().await?;
    let users = UserService::new(db.clone());

    match users.set_role(&args.email, role).await {
        Ok(user) => {
            info!("✅ {} now has role {}", user.email, user.role.as_str());
        }
        Err(e) => {
            error!("❌ Failed to update {}: {}", args.email, e);
            db.close().await?;
            std::process::exit(1);
        }
    }

    db.close().await?;
    Ok(())
}
