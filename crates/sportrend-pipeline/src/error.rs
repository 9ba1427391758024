use sportrend_collector::{CollectError, FeedError};
use sportrend_db::DbError;
use thiserror::Error;

use crate::orchestrator::RunState;

/// Per-item normalization failure. Never aborts a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("content is empty after cleaning")]
    EmptyContent,
}

/// A failure that stops a stage. Per-item problems never surface here.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("feed client: {0}")]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(
        "window of {0} days is outside 1..={max}",
        max = sportrend_core::MAX_WINDOW_DAYS
    )]
    InvalidWindow(u32),

    #[error("repository error during aggregation: {0}")]
    Db(#[from] DbError),
}

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error(
        "retention horizon of {0} days is outside 0..={max}",
        max = sportrend_core::MAX_RETENTION_DAYS
    )]
    InvalidHorizon(u32),

    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run stopped at `stage`; earlier stages' writes are kept.
    #[error("{stage} stage aborted the run: {source}")]
    StageFatal {
        stage: RunState,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    #[must_use]
    pub fn stage(&self) -> RunState {
        match self {
            PipelineError::StageFatal { stage, .. } => *stage,
        }
    }
}
