//! Background job scheduler.
//!
//! Registers the periodic pipeline run and the retention pass. Both jobs only
//! log their outcome; a failed run leaves nothing for the next one to repair.

use std::sync::Arc;

use chrono::Utc;
use sportrend_core::AppConfig;
use sportrend_db::Repository;
use sportrend_pipeline::{run_retention, Pipeline, Trigger};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pipeline: Arc<Pipeline>,
    repo: Arc<dyn Repository>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_pipeline_job(&scheduler, &config.pipeline_cron, pipeline).await?;
    register_retention_job(&scheduler, &config.retention_cron, repo, config.retention_days)
        .await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Run the full pipeline on `schedule` (daily at midnight UTC by default).
async fn register_pipeline_job(
    scheduler: &JobScheduler,
    schedule: &str,
    pipeline: Arc<Pipeline>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let pipeline = Arc::clone(&pipeline);

        Box::pin(async move {
            tracing::info!("scheduler: starting pipeline run");
            match pipeline.run_full_pipeline(Trigger::Scheduler).await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    snapshot_id = ?report.snapshot_id,
                    "scheduler: pipeline run complete"
                ),
                Err(e) => tracing::error!(
                    stage = %e.stage(),
                    error = %e,
                    "scheduler: pipeline run aborted"
                ),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Purge data older than the retention horizon on `schedule`.
async fn register_retention_job(
    scheduler: &JobScheduler,
    schedule: &str,
    repo: Arc<dyn Repository>,
    horizon_days: u32,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let repo = Arc::clone(&repo);

        Box::pin(async move {
            if let Err(e) = run_retention(repo.as_ref(), horizon_days, Utc::now()).await {
                tracing::error!(error = %e, "scheduler: retention pass failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
