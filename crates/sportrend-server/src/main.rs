mod scheduler;

use std::sync::Arc;

use sportrend_db::{PgRepository, Repository};
use sportrend_enrich::EnrichmentServices;
use sportrend_pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(sportrend_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = sportrend_db::PoolConfig::from_app_config(&config);
    let pool = sportrend_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = sportrend_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(pool.clone()));
    let services = EnrichmentServices::from_config(&config)?;
    let queries = sportrend_core::load_queries(&config.queries_path)?.queries;
    let pipeline = Arc::new(Pipeline::from_app_config(
        Arc::clone(&repo),
        services.clone(),
        &config,
        queries,
    )?);

    let mut scheduler =
        scheduler::build_scheduler(pipeline, Arc::clone(&repo), Arc::clone(&config)).await?;
    tracing::info!(
        env = %config.env,
        pipeline_cron = %config.pipeline_cron,
        retention_cron = %config.retention_cron,
        "sportrend worker started"
    );

    shutdown_signal().await;
    scheduler.shutdown().await?;
    services.shutdown();
    pool.close().await;
    tracing::info!("sportrend worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
