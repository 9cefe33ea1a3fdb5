use pollen_salary::{
    bot,
    config::{database, settings},
    core::{member, salary_config},
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load config.toml (optional)
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load config.toml: {e}"))?;

    // 4. Connect and create the schema. DATABASE_URL wins over config.toml.
    let database_url = env::var("DATABASE_URL")
        .ok()
        .or_else(|| settings.database_url.clone())
        .unwrap_or_else(database::get_database_url);
    if database_url.starts_with("sqlite://data/") {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed the member directory and initial salary settings
    let seeded = member::seed_members_if_empty(&db, &settings.members).await?;
    if seeded > 0 {
        info!("Seeded {seeded} members from config.toml");
    }
    // config.toml only fills keys with no stored value; runtime edits win
    let salary_entries = settings.salary_entries()?;
    let stored = salary_config::seed_missing_config(&db, &salary_entries)
        .await
        .inspect_err(|e| error!("Rejected salary settings in config.toml: {e}"))?;
    if stored > 0 {
        info!("Stored {stored} salary settings from config.toml");
    }

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, db).await
}
