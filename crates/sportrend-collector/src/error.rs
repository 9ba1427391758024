use sportrend_db::DbError;
use thiserror::Error;

/// Failures reported by a [`crate::FeedSource`].
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by feed (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("transient feed error: {0}")]
    Transient(String),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed feed item: {0}")]
    MalformedItem(String),

    #[error("invalid feed URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FeedError {
    /// `true` for the rate-limit signal the backoff policy reacts to.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FeedError::RateLimited { .. })
    }
}

/// Failures that stop a collection run rather than a single query.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("repository error during collection: {0}")]
    Db(#[from] DbError),
}
