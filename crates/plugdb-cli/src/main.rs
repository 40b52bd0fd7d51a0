mod catalog;
mod crawl;

use clap::{Parser, Subcommand};
use plugdb_core::{AppConfig, StoreCredential};
use tracing_subscriber::EnvFilter;

use crate::catalog::CatalogCommands;
use crate::crawl::CrawlArgs;

#[derive(Debug, Parser)]
#[command(name = "plugdb")]
#[command(about = "Audio plugin catalog crawler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl vendor sites and save what they list
    Crawl(CrawlArgs),
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Browse the stored catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("plugdb: no command given; run `plugdb --help`");
        return Ok(());
    };

    let config = plugdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Crawl(args) => crawl::run_crawl(&config, &args).await,
        Commands::Db { command } => run_db(&config, command).await,
        Commands::Catalog { command } => catalog::run_catalog(&config, command).await,
    }
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config, config.service_credential.as_ref()).await?;
    match command {
        DbCommands::Ping => {
            plugdb_db::health_check(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = plugdb_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

/// Opens a pool against the configured endpoint as `credential`, or as the
/// endpoint's own user when no credential is configured.
pub(crate) async fn connect(
    config: &AppConfig,
    credential: Option<&StoreCredential>,
) -> anyhow::Result<sqlx::PgPool> {
    if let Some(credential) = credential {
        tracing::debug!(role = %credential.role, "connecting with configured role");
    }
    let pool_config = plugdb_db::PoolConfig::from_app_config(config);
    let pool = plugdb_db::connect_pool_as(&config.database_url, pool_config, credential).await?;
    Ok(pool)
}

/// Marks a crawl run failed, logging rather than propagating a bookkeeping
/// error so the original failure stays the one reported.
pub(crate) async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: &str) {
    if let Err(mark_err) = plugdb_db::fail_crawl_run(pool, run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark crawl run as failed"
        );
    }
}

#[cfg(test)]
mod tests;
