use anyhow::{bail, Context};
use rentdesk_api::{config, db, migrator::Migrator};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// `migration [up|down|fresh|status]`, defaulting to `up`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            config::load_config()
                .context("DATABASE_URL not set and configuration could not be loaded")?
                .database_url
        }
    };

    info!("Starting database migration: {}", command);

    match command.as_str() {
        "up" => rentdesk_api::migrator::run_migration(&database_url).await?,
        "down" | "fresh" | "status" => {
            let pool = db::establish_connection(&database_url).await?;
            match command.as_str() {
                "down" => Migrator::down(&pool, Some(1)).await?,
                "fresh" => Migrator::fresh(&pool).await?,
                _ => Migrator::status(&pool).await?,
            }
        }
        other => bail!("unknown migration command: {} (expected up, down, fresh or status)", other),
    }

    info!("Migration command {} completed", command);
    Ok(())
}
