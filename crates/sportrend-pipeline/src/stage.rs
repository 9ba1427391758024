//! Generic runner for enrichment stages gated by per-item done flags.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sportrend_core::{AppConfig, Entity, ProcessedItem, SentimentAnnotation, Stage};
use sportrend_db::{DbError, Repository};
use sportrend_enrich::{EnrichError, EntityExtractor, SentimentScorer};

use crate::error::StageError;

/// One enrichment stage: how to annotate an item and how to commit the result.
#[async_trait]
pub trait EnrichmentStage: Send + Sync {
    type Annotation: Send + 'static;

    fn stage(&self) -> Stage;

    async fn annotate(&self, item: &ProcessedItem) -> Result<Self::Annotation, EnrichError>;

    /// Annotation recorded when enrichment fails.
    fn error_marker(&self) -> Self::Annotation;

    /// Write the annotation and flip the done flag together.
    /// `Ok(false)` when the flag was already set.
    async fn commit(
        &self,
        repo: &dyn Repository,
        item_id: i64,
        annotation: Self::Annotation,
    ) -> Result<bool, DbError>;
}

pub struct EntityStage {
    extractor: Arc<dyn EntityExtractor>,
}

impl EntityStage {
    #[must_use]
    pub fn new(extractor: Arc<dyn EntityExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl EnrichmentStage for EntityStage {
    type Annotation = Vec<Entity>;

    fn stage(&self) -> Stage {
        Stage::Entities
    }

    async fn annotate(&self, item: &ProcessedItem) -> Result<Vec<Entity>, EnrichError> {
        self.extractor.extract(&item.normalized_text).await
    }

    fn error_marker(&self) -> Vec<Entity> {
        Vec::new()
    }

    async fn commit(
        &self,
        repo: &dyn Repository,
        item_id: i64,
        annotation: Vec<Entity>,
    ) -> Result<bool, DbError> {
        repo.complete_entities(item_id, annotation).await
    }
}

pub struct SentimentStage {
    scorer: Arc<dyn SentimentScorer>,
}

impl SentimentStage {
    #[must_use]
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl EnrichmentStage for SentimentStage {
    type Annotation = SentimentAnnotation;

    fn stage(&self) -> Stage {
        Stage::Sentiment
    }

    async fn annotate(&self, item: &ProcessedItem) -> Result<SentimentAnnotation, EnrichError> {
        self.scorer.score(&item.normalized_text).await
    }

    fn error_marker(&self) -> SentimentAnnotation {
        SentimentAnnotation::error()
    }

    async fn commit(
        &self,
        repo: &dyn Repository,
        item_id: i64,
        annotation: SentimentAnnotation,
    ) -> Result<bool, DbError> {
        repo.complete_sentiment(item_id, annotation).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOptions {
    /// Items claimed per batch.
    pub batch_size: usize,
    /// Enrichment calls in flight at once within a batch.
    pub concurrency: usize,
    /// How long a claim shields an item from other runners.
    pub lease: Duration,
    /// No batch is claimed after this instant.
    pub deadline: Option<Instant>,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 4,
            lease: Duration::from_secs(600),
            deadline: None,
        }
    }
}

impl StageOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.enrich_concurrency,
            lease: Duration::from_secs(config.claim_lease_secs),
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub batches: usize,
    pub claimed: usize,
    pub annotated: usize,
    /// Items committed with the error marker.
    pub failed: usize,
    /// Items another runner completed between claim and commit.
    pub already_done: usize,
    pub timed_out: bool,
}

impl StageReport {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            batches: 0,
            claimed: 0,
            annotated: 0,
            failed: 0,
            already_done: 0,
            timed_out: false,
        }
    }
}

enum ItemOutcome {
    Annotated,
    Failed,
    AlreadyDone,
}

async fn process_item<S: EnrichmentStage + ?Sized>(
    repo: &dyn Repository,
    stage: &S,
    item: &ProcessedItem,
) -> Result<ItemOutcome, DbError> {
    let (annotation, failed) = match stage.annotate(item).await {
        Ok(annotation) => (annotation, false),
        Err(err) => {
            tracing::warn!(
                stage = %stage.stage(),
                item_id = item.id,
                error = %err,
                "enrichment failed, recording error marker"
            );
            (stage.error_marker(), true)
        }
    };

    let written = stage.commit(repo, item.id, annotation).await?;
    Ok(match (written, failed) {
        (false, _) => ItemOutcome::AlreadyDone,
        (true, true) => ItemOutcome::Failed,
        (true, false) => ItemOutcome::Annotated,
    })
}

/// Enrich every item still pending `stage`, one claimed batch at a time.
///
/// Each item's annotation is committed together with its done flag, so a
/// stopped run leaves no half-annotated item. Enrichment failures are
/// committed as error markers and never retried.
///
/// # Errors
///
/// Returns [`StageError::Db`] if claiming or committing fails. Items already
/// committed stay committed; claimed but uncommitted items become claimable
/// again when their lease expires.
pub async fn run_stage<S: EnrichmentStage + ?Sized>(
    repo: &dyn Repository,
    stage: &S,
    options: &StageOptions,
) -> Result<StageReport, StageError> {
    let mut report = StageReport::new(stage.stage());
    let concurrency = options.concurrency.max(1);

    loop {
        if options.deadline.is_some_and(|d| Instant::now() >= d) {
            report.timed_out = true;
            tracing::warn!(
                stage = %stage.stage(),
                claimed = report.claimed,
                "stage deadline reached"
            );
            break;
        }

        let claimed = repo
            .claim_pending(stage.stage(), options.batch_size, options.lease)
            .await?;
        if claimed.is_empty() {
            break;
        }
        report.batches += 1;
        report.claimed += claimed.len();

        let pending: Vec<_> = claimed
            .iter()
            .map(|item| process_item(repo, stage, item))
            .collect();
        let outcomes: Vec<Result<ItemOutcome, DbError>> = stream::iter(pending)
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome? {
                ItemOutcome::Annotated => report.annotated += 1,
                ItemOutcome::Failed => report.failed += 1,
                ItemOutcome::AlreadyDone => report.already_done += 1,
            }
        }
        tracing::debug!(
            stage = %stage.stage(),
            batch = report.batches,
            annotated = report.annotated,
            failed = report.failed,
            "batch committed"
        );
    }

    tracing::info!(
        stage = %stage.stage(),
        claimed = report.claimed,
        annotated = report.annotated,
        failed = report.failed,
        already_done = report.already_done,
        timed_out = report.timed_out,
        "enrichment stage finished"
    );
    Ok(report)
}
