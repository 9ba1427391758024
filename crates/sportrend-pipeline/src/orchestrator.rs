//! Sequential run of every pipeline stage.
//!
//! A run walks `Collect → Normalize → ExtractEntities → ScoreSentiment →
//! Aggregate → Done`. Stages resume from persisted flags rather than from run
//! identity, so a scheduled run and a manual run may overlap safely.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sportrend_collector::{BackoffPolicy, CollectSummary, Collector, HttpFeedClient};
use sportrend_core::{AppConfig, EntityType, QueryConfig};
use sportrend_db::Repository;
use sportrend_enrich::EnrichmentServices;
use tracing::Instrument;
use uuid::Uuid;

use crate::aggregate::{aggregate, AggregateParams};
use crate::error::{PipelineError, StageError};
use crate::normalize::{run_normalize_stage, NormalizeReport};
use crate::stage::{run_stage, EntityStage, SentimentStage, StageOptions, StageReport};

/// Who asked for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scheduler,
    Cli,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Trigger::Scheduler => "scheduler",
            Trigger::Cli => "cli",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Collect,
    Normalize,
    ExtractEntities,
    ScoreSentiment,
    Aggregate,
    Done,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunState::Collect => "collect",
            RunState::Normalize => "normalize",
            RunState::ExtractEntities => "extract_entities",
            RunState::ScoreSentiment => "score_sentiment",
            RunState::Aggregate => "aggregate",
            RunState::Done => "done",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// `None` when no feed is configured or collection timed out.
    pub collect: Option<CollectSummary>,
    pub normalize: Option<NormalizeReport>,
    pub entities: Option<StageReport>,
    pub sentiment: Option<StageReport>,
    /// `None` when the window held nothing to aggregate.
    pub snapshot_id: Option<i64>,
    pub final_state: RunState,
}

impl RunReport {
    fn new(run_id: Uuid, trigger: Trigger) -> Self {
        Self {
            run_id,
            trigger,
            started_at: Utc::now(),
            finished_at: None,
            collect: None,
            normalize: None,
            entities: None,
            sentiment: None,
            snapshot_id: None,
            final_state: RunState::Collect,
        }
    }
}

/// Run-independent knobs, resolved once from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub queries: Vec<QueryConfig>,
    pub max_items_per_query: usize,
    pub stage: StageOptions,
    /// Per-stage limit. Aggregation is never cut short.
    pub stage_timeout: Option<Duration>,
    pub window_days: u32,
    pub entity_types: Vec<EntityType>,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, queries: Vec<QueryConfig>) -> Self {
        Self {
            queries,
            max_items_per_query: config.max_items_per_query,
            stage: StageOptions::from_app_config(config),
            stage_timeout: (config.stage_timeout_secs > 0)
                .then(|| Duration::from_secs(config.stage_timeout_secs)),
            window_days: config.window_days,
            entity_types: config.entity_types.clone(),
        }
    }
}

pub struct Pipeline {
    repo: Arc<dyn Repository>,
    collector: Option<Collector>,
    services: EnrichmentServices,
    settings: PipelineSettings,
}

impl Pipeline {
    /// A pipeline without a feed; the collect stage is skipped.
    #[must_use]
    pub fn new(
        repo: Arc<dyn Repository>,
        services: EnrichmentServices,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            repo,
            collector: None,
            services,
            settings,
        }
    }

    #[must_use]
    pub fn with_collector(mut self, collector: Collector) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Wire the HTTP feed client when `SPORTREND_FEED_URL` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Feed`] if the feed client cannot be built.
    pub fn from_app_config(
        repo: Arc<dyn Repository>,
        services: EnrichmentServices,
        config: &AppConfig,
        queries: Vec<QueryConfig>,
    ) -> Result<Self, StageError> {
        let settings = PipelineSettings::from_app_config(config, queries);
        let pipeline = Self::new(Arc::clone(&repo), services, settings);
        if config.feed_url.is_none() {
            return Ok(pipeline);
        }
        let client = HttpFeedClient::from_app_config(config)?;
        let backoff = BackoffPolicy::from_app_config(config);
        let collector = Collector::new(Arc::new(client), repo, backoff)
            .with_inter_request_delay(Duration::from_millis(config.inter_request_delay_ms));
        Ok(pipeline.with_collector(collector))
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn deadline(&self) -> Option<Instant> {
        self.settings.stage_timeout.map(|limit| Instant::now() + limit)
    }

    /// # Errors
    ///
    /// Returns [`StageError::Collect`] if the repository rejects a write.
    pub async fn collect(&self) -> Result<Option<CollectSummary>, StageError> {
        let Some(collector) = &self.collector else {
            tracing::info!(stage = "collect", "no feed configured, skipping collection");
            return Ok(None);
        };
        let work = collector.collect_all(&self.settings.queries, self.settings.max_items_per_query);
        let summary = match self.settings.stage_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        stage = "collect",
                        timeout_secs = limit.as_secs(),
                        "collection timed out; continuing with stored items"
                    );
                    return Ok(None);
                }
            },
            None => work.await?,
        };
        tracing::info!(
            stage = "collect",
            queries = summary.queries.len(),
            ingested = summary.ingested(),
            abandoned = summary.abandoned(),
            "collect stage finished"
        );
        Ok(Some(summary))
    }

    /// # Errors
    ///
    /// Returns [`StageError::Db`] if the repository fails.
    pub async fn normalize(&self) -> Result<NormalizeReport, StageError> {
        run_normalize_stage(
            self.repo.as_ref(),
            self.settings.stage.batch_size,
            self.deadline(),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`StageError::Db`] if claiming or committing fails.
    pub async fn extract_entities(&self) -> Result<StageReport, StageError> {
        let stage = EntityStage::new(Arc::clone(self.services.entities()));
        let options = self.settings.stage.with_deadline(self.deadline());
        run_stage(self.repo.as_ref(), &stage, &options).await
    }

    /// # Errors
    ///
    /// Returns [`StageError::Db`] if claiming or committing fails.
    pub async fn score_sentiment(&self) -> Result<StageReport, StageError> {
        let stage = SentimentStage::new(Arc::clone(self.services.sentiment()));
        let options = self.settings.stage.with_deadline(self.deadline());
        run_stage(self.repo.as_ref(), &stage, &options).await
    }

    /// Aggregate the trailing window; `window_days` overrides the configured length.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Aggregate`] if the repository fails.
    pub async fn aggregate(&self, window_days: Option<u32>) -> Result<Option<i64>, StageError> {
        let params = AggregateParams::new(
            window_days.unwrap_or(self.settings.window_days),
            self.settings.entity_types.clone(),
        );
        let record = aggregate(self.repo.as_ref(), &params).await?;
        Ok(record.map(|r| r.id))
    }

    /// Run every stage in order under a fresh `run_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageFatal`] naming the stage that stopped the
    /// run. Writes of earlier stages stay in place.
    pub async fn run_full_pipeline(&self, trigger: Trigger) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id, %trigger);
        self.run(run_id, trigger).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, trigger: Trigger) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::new(run_id, trigger);
        tracing::info!("pipeline run started");

        report.collect = self.collect().await.map_err(|e| fatal(RunState::Collect, e))?;

        report.final_state = RunState::Normalize;
        report.normalize = Some(
            self.normalize()
                .await
                .map_err(|e| fatal(RunState::Normalize, e))?,
        );

        report.final_state = RunState::ExtractEntities;
        report.entities = Some(
            self.extract_entities()
                .await
                .map_err(|e| fatal(RunState::ExtractEntities, e))?,
        );

        report.final_state = RunState::ScoreSentiment;
        report.sentiment = Some(
            self.score_sentiment()
                .await
                .map_err(|e| fatal(RunState::ScoreSentiment, e))?,
        );

        report.final_state = RunState::Aggregate;
        report.snapshot_id = self
            .aggregate(None)
            .await
            .map_err(|e| fatal(RunState::Aggregate, e))?;

        report.final_state = RunState::Done;
        report.finished_at = Some(Utc::now());
        tracing::info!(
            ingested = report.collect.as_ref().map_or(0, CollectSummary::ingested),
            normalized = report.normalize.as_ref().map_or(0, |r| r.normalized),
            entities = report.entities.as_ref().map_or(0, |r| r.annotated),
            sentiment = report.sentiment.as_ref().map_or(0, |r| r.annotated),
            snapshot_id = ?report.snapshot_id,
            "pipeline run finished"
        );
        Ok(report)
    }
}

fn fatal(stage: RunState, source: StageError) -> PipelineError {
    tracing::error!(%stage, error = %source, "stage failed; aborting run");
    PipelineError::StageFatal { stage, source }
}
