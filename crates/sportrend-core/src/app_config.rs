use std::path::PathBuf;

use crate::annotations::EntityType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Longest trailing window the aggregator accepts.
pub const MAX_WINDOW_DAYS: u32 = 365;
/// Longest retention horizon accepted.
pub const MAX_RETENTION_DAYS: u32 = 3650;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub queries_path: PathBuf,

    /// Base URL of the search feed. `None` turns the collect stage into a no-op.
    pub feed_url: Option<String>,
    pub feed_api_key: Option<String>,
    pub feed_timeout_secs: u64,
    pub feed_user_agent: String,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
    pub max_retries: u32,
    pub inter_request_delay_ms: u64,
    pub max_items_per_query: usize,

    pub batch_size: usize,
    pub enrich_concurrency: usize,
    /// Per-stage timeout; `0` means stages run until their backlog is drained.
    pub stage_timeout_secs: u64,
    pub claim_lease_secs: u64,
    /// Base URL of the NER/sentiment model server. `None` selects the lexicon implementations.
    pub model_url: Option<String>,

    pub window_days: u32,
    pub entity_types: Vec<EntityType>,

    pub pipeline_cron: String,
    pub retention_cron: String,
    pub retention_days: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("queries_path", &self.queries_path)
            .field("feed_url", &self.feed_url)
            .field(
                "feed_api_key",
                &self.feed_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("feed_timeout_secs", &self.feed_timeout_secs)
            .field("feed_user_agent", &self.feed_user_agent)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .field("backoff_cap_secs", &self.backoff_cap_secs)
            .field("max_retries", &self.max_retries)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("max_items_per_query", &self.max_items_per_query)
            .field("batch_size", &self.batch_size)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field("stage_timeout_secs", &self.stage_timeout_secs)
            .field("claim_lease_secs", &self.claim_lease_secs)
            .field("model_url", &self.model_url)
            .field("window_days", &self.window_days)
            .field("entity_types", &self.entity_types)
            .field("pipeline_cron", &self.pipeline_cron)
            .field("retention_cron", &self.retention_cron)
            .field("retention_days", &self.retention_days)
            .finish()
    }
}
