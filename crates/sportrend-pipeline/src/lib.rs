//! The processing side of sportrend: normalization, enrichment stages, trend
//! aggregation, the run orchestrator, dashboard reads and retention.

pub mod aggregate;
pub mod dashboard;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod retention;
pub mod stage;

pub use aggregate::{aggregate, classify, growth_rate, AggregateParams};
pub use dashboard::{
    latest_entity_detail, latest_snapshot, latest_sport_trends, EntityDetailView, Lookup,
    SportTrends,
};
pub use error::{AggregateError, NormalizeError, PipelineError, RetentionError, StageError};
pub use normalize::{normalize_content, run_normalize_stage, NormalizeReport, NormalizedText};
pub use orchestrator::{Pipeline, PipelineSettings, RunReport, RunState, Trigger};
pub use retention::{run_retention, RetentionReport};
pub use stage::{
    run_stage, EnrichmentStage, EntityStage, SentimentStage, StageOptions, StageReport,
};
