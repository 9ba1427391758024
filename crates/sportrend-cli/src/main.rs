mod snapshot;
mod stages;

use clap::{Parser, Subcommand};
use sportrend_core::{EntityType, MAX_RETENTION_DAYS, MAX_WINDOW_DAYS};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sportrend-cli")]
#[command(about = "Arabic sports trend pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run every stage in order, as the scheduler would
    Run,
    /// Pull configured feed queries into the raw-item store
    Collect,
    /// Clean and tokenize unprocessed raw items
    Normalize,
    /// Extract entities for items still pending
    Entities,
    /// Score sentiment for items whose entities are done
    Sentiment,
    /// Build a new snapshot over the trailing window
    Aggregate {
        /// Window length in days (defaults to SPORTREND_WINDOW_DAYS)
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
        )]
        window_days: Option<u32>,
    },
    /// Print the latest snapshot, or one slice of it, as JSON
    Snapshot {
        /// Entity type: PLAYER, TEAM or COMPETITION
        #[arg(long)]
        entity_type: Option<EntityType>,

        /// Restrict to one sport category
        #[arg(long)]
        sport_type: Option<String>,
    },
    /// Delete data older than the retention horizon and end stale trends
    Purge {
        /// Horizon in days (defaults to SPORTREND_RETENTION_DAYS)
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_RETENTION_DAYS))
        )]
        days: Option<u32>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("sportrend-cli: no command given; see --help");
        return Ok(());
    };

    let config = sportrend_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = sportrend_db::PoolConfig::from_app_config(&config);
    let pool = sportrend_db::connect_pool(&config.database_url, pool_config).await?;

    let result = match command {
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = sportrend_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            sportrend_db::ping(&pool).await?;
            println!("database reachable");
            Ok(())
        }
        Commands::Snapshot {
            entity_type,
            sport_type,
        } => snapshot::run_snapshot(&pool, entity_type, sport_type.as_deref()).await,
        Commands::Purge { days } => stages::run_purge(&pool, &config, days).await,
        stage => stages::run_stage_command(&pool, &config, stage).await,
    };

    pool.close().await;
    result
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests;
