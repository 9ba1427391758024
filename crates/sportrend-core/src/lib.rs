//! Shared domain types and configuration for the sportrend pipeline.
//!
//! Every other crate in the workspace speaks in these records: raw feed items,
//! their normalized counterparts, enrichment annotations, trend documents and
//! aggregation snapshots.

mod annotations;
mod app_config;
mod config;
mod items;
mod queries;
mod snapshot;
pub mod text;
mod trends;

use thiserror::Error;

pub use annotations::{Entity, EntityType, SentimentAnnotation, SentimentLabel, Span};
pub use app_config::{AppConfig, Environment, MAX_RETENTION_DAYS, MAX_WINDOW_DAYS};
pub use config::{load_app_config, load_app_config_from_env};
pub use items::{
    EnrichedItem, NaturalKey, NewProcessedItem, NewRawItem, ProcessedItem, RawItem, Stage,
};
pub use queries::{load_queries, QueriesFile, QueryConfig};
pub use snapshot::{
    DashboardSummary, DayBucket, EntityHighlight, EntityTypeDetail, HashtagCount, SampleItem,
    Snapshot, SnapshotRecord, SportBreakdown, TopEntity, TrendEntry, WordCount,
};
pub use trends::{
    EntityRef, NewTopic, NewTrend, SentimentTally, Topic, Trend, TrendMetrics, TrendStatus,
};

/// Placeholder category for items whose collector did not tag a sport.
pub const UNKNOWN_SPORT: &str = "unknown";

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid entity type: {0}")]
    InvalidEntityType(String),

    #[error("invalid sentiment label: {0}")]
    InvalidSentimentLabel(String),

    #[error("invalid trend status: {0}")]
    InvalidTrendStatus(String),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read queries file {path}: {source}")]
    QueriesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse queries file: {0}")]
    QueriesFileParse(#[from] serde_yaml::Error),

    #[error("queries validation error: {0}")]
    Validation(String),
}
