use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sportrend_core::QueryConfig;
use sportrend_db::{Repository, UpsertOutcome};

use crate::backoff::BackoffPolicy;
use crate::error::{CollectError, FeedError};
use crate::filter::{screen, Screened};
use crate::source::{FeedPage, FeedQuery, FeedSource};

/// Pages fetched per query before giving up on a cursor that never ends.
const MAX_PAGES: usize = 200;

/// Outcome of collecting one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectReport {
    pub query: String,
    /// Items the feed returned, including malformed ones.
    pub fetched: usize,
    /// Newly stored raw items.
    pub ingested: usize,
    /// Items whose natural key was already stored.
    pub duplicates: usize,
    /// Spam and below-threshold items.
    pub filtered: usize,
    pub item_errors: usize,
    /// The query stopped early: retry budget exhausted or a page could not be fetched.
    pub abandoned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectSummary {
    pub queries: Vec<CollectReport>,
}

impl CollectSummary {
    #[must_use]
    pub fn ingested(&self) -> usize {
        self.queries.iter().map(|q| q.ingested).sum()
    }

    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.queries.iter().filter(|q| q.abandoned).count()
    }
}

/// Pulls feed results into the repository with dedup-on-natural-key semantics.
pub struct Collector {
    source: Arc<dyn FeedSource>,
    repo: Arc<dyn Repository>,
    backoff: BackoffPolicy,
    inter_request_delay: Duration,
}

impl Collector {
    #[must_use]
    pub fn new(
        source: Arc<dyn FeedSource>,
        repo: Arc<dyn Repository>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            source,
            repo,
            backoff,
            inter_request_delay: Duration::ZERO,
        }
    }

    /// Pause between successive page requests of one query.
    #[must_use]
    pub fn with_inter_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    /// Collect up to `max_items` items for one query.
    ///
    /// Feed failures never escape: rate limits are retried per the backoff
    /// policy, bad items are skipped, and an unfetchable page abandons the query.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Db`] if the repository rejects a write.
    pub async fn collect(
        &self,
        query: &FeedQuery,
        max_items: usize,
    ) -> Result<CollectReport, CollectError> {
        let mut report = CollectReport {
            query: query.query.clone(),
            ..CollectReport::default()
        };
        let mut cursor: Option<String> = None;

        for page_number in 0..MAX_PAGES {
            if report.fetched >= max_items {
                break;
            }
            if page_number > 0 && !self.inter_request_delay.is_zero() {
                tokio::time::sleep(self.inter_request_delay).await;
            }

            let page = match self.fetch_with_backoff(query, cursor.as_deref()).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(
                        query = %query.query,
                        error = %err,
                        fetched = report.fetched,
                        "abandoning query"
                    );
                    report.abandoned = true;
                    break;
                }
            };

            let page_len = page.items.len();
            for entry in page.items {
                if report.fetched >= max_items {
                    break;
                }
                report.fetched += 1;
                self.ingest(entry, query, &mut report).await?;
            }

            match page.next_cursor {
                Some(next) if page_len > 0 => cursor = Some(next),
                _ => break,
            }
        }

        tracing::info!(
            query = %report.query,
            fetched = report.fetched,
            ingested = report.ingested,
            duplicates = report.duplicates,
            filtered = report.filtered,
            item_errors = report.item_errors,
            abandoned = report.abandoned,
            "query collected"
        );
        Ok(report)
    }

    /// Collect every configured query in order. An abandoned query never stops the next one.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Db`] if the repository rejects a write.
    pub async fn collect_all(
        &self,
        queries: &[QueryConfig],
        default_max_items: usize,
    ) -> Result<CollectSummary, CollectError> {
        let mut summary = CollectSummary::default();
        for config in queries {
            let query = FeedQuery::from_config(config);
            let max_items = config.max_items.unwrap_or(default_max_items);
            summary.queries.push(self.collect(&query, max_items).await?);
        }
        Ok(summary)
    }

    async fn ingest(
        &self,
        entry: Result<crate::source::CandidateItem, FeedError>,
        query: &FeedQuery,
        report: &mut CollectReport,
    ) -> Result<(), CollectError> {
        let candidate = match entry {
            Ok(candidate) => candidate,
            Err(err) => {
                tracing::warn!(query = %query.query, error = %err, "skipping unreadable feed item");
                report.item_errors += 1;
                return Ok(());
            }
        };

        let item = match screen(candidate, query, self.source.name()) {
            Screened::Accepted(item) => item,
            Screened::Spam => {
                report.filtered += 1;
                return Ok(());
            }
            Screened::BelowMinLikes { likes } => {
                tracing::debug!(query = %query.query, likes, "below min_likes");
                report.filtered += 1;
                return Ok(());
            }
        };

        if let Err(err) = item.validate() {
            tracing::warn!(query = %query.query, error = %err, "skipping unkeyable feed item");
            report.item_errors += 1;
            return Ok(());
        }

        match self.repo.insert_raw_if_absent(item).await? {
            UpsertOutcome::Inserted(_) => report.ingested += 1,
            UpsertOutcome::Existing(_) => report.duplicates += 1,
        }
        Ok(())
    }

    /// Fetch one page, sleeping through up to `max_retries` rate-limit signals.
    async fn fetch_with_backoff(
        &self,
        query: &FeedQuery,
        cursor: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        let mut attempt = 0u32;
        loop {
            match self.source.fetch_page(query, cursor).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_rate_limited() => {
                    attempt += 1;
                    if self.backoff.is_exhausted(attempt) {
                        return Err(err);
                    }
                    let delay = BackoffPolicy::with_jitter(self.backoff.delay_for(attempt));
                    tracing::warn!(
                        query = %query.query,
                        attempt,
                        max_retries = self.backoff.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
