//! Pipeline command handlers: the full run, single stages and retention.
//!
//! Each handler prints its stage report as JSON. A stage that fails fatally
//! returns an error, so the process exits non-zero.

use std::sync::Arc;

use chrono::Utc;
use sportrend_core::AppConfig;
use sportrend_db::{PgRepository, Repository};
use sportrend_enrich::EnrichmentServices;
use sportrend_pipeline::{run_retention, Pipeline, Trigger};

use crate::{print_json, Commands};

fn build_pipeline(
    pool: &sqlx::PgPool,
    config: &AppConfig,
) -> anyhow::Result<(Pipeline, EnrichmentServices)> {
    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(pool.clone()));
    let services = EnrichmentServices::from_config(config)?;
    let queries = sportrend_core::load_queries(&config.queries_path)?.queries;
    let pipeline = Pipeline::from_app_config(repo, services.clone(), config, queries)?;
    Ok((pipeline, services))
}

/// Dispatch `run`, `collect`, `normalize`, `entities`, `sentiment` and `aggregate`.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or the stage fails fatally.
pub(crate) async fn run_stage_command(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: Commands,
) -> anyhow::Result<()> {
    let (pipeline, services) = build_pipeline(pool, config)?;

    let outcome = match command {
        Commands::Run => match pipeline.run_full_pipeline(Trigger::Cli).await {
            Ok(report) => print_json(&report),
            Err(e) => Err(anyhow::anyhow!("pipeline run aborted at {}: {e}", e.stage())),
        },
        Commands::Collect => match pipeline.collect().await? {
            Some(summary) => print_json(&summary),
            None => {
                println!("collection skipped: no feed configured or collection timed out");
                Ok(())
            }
        },
        Commands::Normalize => print_json(&pipeline.normalize().await?),
        Commands::Entities => print_json(&pipeline.extract_entities().await?),
        Commands::Sentiment => print_json(&pipeline.score_sentiment().await?),
        Commands::Aggregate { window_days } => match pipeline.aggregate(window_days).await? {
            Some(id) => {
                println!("snapshot {id} written");
                Ok(())
            }
            None => {
                println!("no enriched items in the window; no snapshot written");
                Ok(())
            }
        },
        other => Err(anyhow::anyhow!("{other:?} is not a pipeline stage")),
    };

    services.shutdown();
    outcome
}

/// Run one retention pass with `days` or the configured horizon.
///
/// # Errors
///
/// Returns an error if the repository fails.
pub(crate) async fn run_purge(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    days: Option<u32>,
) -> anyhow::Result<()> {
    let repo = PgRepository::new(pool.clone());
    let horizon = days.unwrap_or(config.retention_days);
    let report = run_retention(&repo, horizon, Utc::now()).await?;
    print_json(&report)
}
