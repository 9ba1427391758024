use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sportrend_core::QueryConfig;

use crate::error::FeedError;

/// One search the collector runs against a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub query: String,
    pub sport_type: String,
    pub min_likes: i64,
    /// Items requested per page.
    pub page_size: usize,
}

impl FeedQuery {
    pub const DEFAULT_PAGE_SIZE: usize = 50;

    #[must_use]
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            query: config.query.clone(),
            sport_type: config.effective_sport_type(),
            min_likes: config.min_likes,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// An item as the feed returns it, before filtering and keying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Feed-assigned id. Items without one are keyed by a content hash.
    #[serde(default)]
    pub id: Option<String>,
    /// Id of the post or video the item was published under.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_followers: Option<i64>,
    #[serde(default)]
    pub author_verified: bool,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub shares: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of feed results. Each entry fails or succeeds on its own.
#[derive(Debug, Default)]
pub struct FeedPage {
    pub items: Vec<Result<CandidateItem, FeedError>>,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Value stored as `source` on every raw item this feed produces.
    fn name(&self) -> &str;

    /// Fetch one page of results for `query`, continuing from `cursor`.
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&str>,
    ) -> Result<FeedPage, FeedError>;
}
