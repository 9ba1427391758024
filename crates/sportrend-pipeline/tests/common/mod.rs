//! Fixtures shared by the pipeline integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sportrend_collector::{CandidateItem, FeedError, FeedPage, FeedQuery, FeedSource};
use sportrend_core::text::tokenize;
use sportrend_core::{
    EnrichedItem, Entity, EntityType, NaturalKey, NewProcessedItem, NewRawItem, NewTopic,
    NewTrend, ProcessedItem, RawItem, SentimentAnnotation, SentimentLabel, Snapshot,
    SnapshotRecord, Span, Stage, Topic, Trend,
};
use sportrend_db::{
    DbError, EnrichedFilter, MemoryRepository, PurgeCounts, Repository, SnapshotFilter,
    UpsertOutcome,
};
use sportrend_enrich::{EnrichError, EntityExtractor, SentimentScorer};

/// Feed that replays one scripted page per call, then returns empty pages.
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<FeedPage>>,
}

impl ScriptedFeed {
    pub fn with_items(texts: &[(&str, &str)]) -> Self {
        let items = texts
            .iter()
            .map(|(id, text)| {
                Ok(CandidateItem {
                    id: Some((*id).to_string()),
                    text: (*text).to_string(),
                    author_name: Some("مشجع".to_string()),
                    likes: 3,
                    ..CandidateItem::default()
                })
            })
            .collect();
        Self {
            pages: Mutex::new(VecDeque::from([FeedPage {
                items,
                next_cursor: None,
            }])),
        }
    }

    /// Make the next fetch replay the same items again.
    pub fn replay(&self, texts: &[(&str, &str)]) {
        let again = Self::with_items(texts);
        let page = again.pages.lock().expect("lock").pop_front().expect("page");
        self.pages.lock().expect("lock").push_back(page);
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_page(
        &self,
        _query: &FeedQuery,
        _cursor: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        Ok(self.pages.lock().expect("lock").pop_front().unwrap_or_default())
    }
}

/// Extractor that returns the same entities for every text and counts calls.
/// Texts containing `fail_marker` produce an error.
pub struct FixedExtractor {
    entities: Vec<Entity>,
    fail_marker: Option<String>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FixedExtractor {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            fail_marker: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityExtractor for FixedExtractor {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn extract(&self, text: &str) -> Result<Vec<Entity>, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_marker.as_deref().is_some_and(|m| text.contains(m)) {
            return Err(EnrichError::Model("extractor unavailable".to_string()));
        }
        Ok(self.entities.clone())
    }
}

/// Scorer that answers with one fixed annotation, or fails on a marker.
pub struct FixedScorer {
    annotation: SentimentAnnotation,
    fail_marker: Option<String>,
    pub calls: AtomicUsize,
}

impl FixedScorer {
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        Self {
            annotation: SentimentAnnotation::new(label, score),
            fail_marker: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentScorer for FixedScorer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn score(&self, text: &str) -> Result<SentimentAnnotation, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_marker.as_deref().is_some_and(|m| text.contains(m)) {
            return Err(EnrichError::Model("scorer unavailable".to_string()));
        }
        Ok(self.annotation)
    }
}

pub fn entity(text: &str, entity_type: EntityType) -> Entity {
    Entity {
        text: text.to_string(),
        entity_type,
        span: Span {
            start: 0,
            end: text.chars().count(),
        },
        confidence: 0.9,
    }
}

pub fn new_raw(
    source_id: &str,
    content: &str,
    sport: &str,
    created_at: DateTime<Utc>,
) -> NewRawItem {
    NewRawItem {
        source: "youtube".to_string(),
        source_id: source_id.to_string(),
        content: content.to_string(),
        author_id: None,
        author_name: Some("مشجع".to_string()),
        author_followers: None,
        author_verified: false,
        likes: 0,
        shares: 0,
        comments: 0,
        language: "ar".to_string(),
        hashtags: Vec::new(),
        sport_type: Some(sport.to_string()),
        created_at,
    }
}

/// Store one raw item with a processed record, without enrichment.
pub async fn seed_processed(
    repo: &MemoryRepository,
    source_id: &str,
    content: &str,
    processed_at: DateTime<Utc>,
) -> i64 {
    let raw_id = repo
        .insert_raw_if_absent(new_raw(source_id, content, "football", processed_at))
        .await
        .expect("raw insert")
        .id();
    let processed = repo
        .upsert_processed(NewProcessedItem {
            raw_item_id: raw_id,
            clean_text: content.to_string(),
            normalized_text: content.to_string(),
            tokens: tokenize(content),
            processed_at,
        })
        .await
        .expect("processed upsert");
    repo.set_raw_processed(raw_id, true).await.expect("flag");
    processed.id
}

/// Store one fully enriched item.
pub async fn seed_enriched(
    repo: &MemoryRepository,
    source_id: &str,
    content: &str,
    sport: &str,
    processed_at: DateTime<Utc>,
    entities: Vec<Entity>,
    sentiment: SentimentAnnotation,
) -> i64 {
    let raw_id = repo
        .insert_raw_if_absent(new_raw(source_id, content, sport, processed_at))
        .await
        .expect("raw insert")
        .id();
    let processed = repo
        .upsert_processed(NewProcessedItem {
            raw_item_id: raw_id,
            clean_text: content.to_string(),
            normalized_text: content.to_string(),
            tokens: tokenize(content),
            processed_at,
        })
        .await
        .expect("processed upsert");
    repo.set_raw_processed(raw_id, true).await.expect("flag");
    assert!(repo
        .complete_entities(processed.id, entities)
        .await
        .expect("entities"));
    assert!(repo
        .complete_sentiment(processed.id, sentiment)
        .await
        .expect("sentiment"));
    processed.id
}

pub fn shared(repo: &Arc<MemoryRepository>) -> Arc<dyn Repository> {
    Arc::clone(repo) as Arc<dyn Repository>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every claim fails with a database error.
    FailClaims,
    /// Each page of enriched items loses its first row, as if the raw item
    /// had been purged mid-scan.
    DropFirstOfPage,
}

/// Delegates to the in-memory store, injecting one kind of fault.
pub struct FaultyRepository {
    pub inner: MemoryRepository,
    fault: Fault,
}

impl FaultyRepository {
    pub fn new(inner: MemoryRepository, fault: Fault) -> Self {
        Self { inner, fault }
    }
}

#[async_trait]
impl Repository for FaultyRepository {
    async fn find_raw_by_key(&self, key: &NaturalKey) -> Result<Option<RawItem>, DbError> {
        self.inner.find_raw_by_key(key).await
    }

    async fn insert_raw_if_absent(&self, item: NewRawItem) -> Result<UpsertOutcome, DbError> {
        self.inner.insert_raw_if_absent(item).await
    }

    async fn list_unprocessed_raw(
        &self,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<RawItem>, DbError> {
        self.inner.list_unprocessed_raw(after_id, limit).await
    }

    async fn set_raw_processed(&self, raw_id: i64, processed: bool) -> Result<(), DbError> {
        self.inner.set_raw_processed(raw_id, processed).await
    }

    async fn upsert_processed(&self, item: NewProcessedItem) -> Result<ProcessedItem, DbError> {
        self.inner.upsert_processed(item).await
    }

    async fn delete_processed_for_raw(&self, raw_id: i64) -> Result<bool, DbError> {
        self.inner.delete_processed_for_raw(raw_id).await
    }

    async fn claim_pending(
        &self,
        stage: Stage,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<ProcessedItem>, DbError> {
        if self.fault == Fault::FailClaims {
            return Err(DbError::Decode("connection reset".to_string()));
        }
        self.inner.claim_pending(stage, limit, lease).await
    }

    async fn complete_entities(&self, id: i64, entities: Vec<Entity>) -> Result<bool, DbError> {
        self.inner.complete_entities(id, entities).await
    }

    async fn complete_sentiment(
        &self,
        id: i64,
        sentiment: SentimentAnnotation,
    ) -> Result<bool, DbError> {
        self.inner.complete_sentiment(id, sentiment).await
    }

    async fn list_enriched(&self, filter: &EnrichedFilter) -> Result<Vec<EnrichedItem>, DbError> {
        let mut page = self.inner.list_enriched(filter).await?;
        if self.fault == Fault::DropFirstOfPage && !page.is_empty() {
            page.remove(0);
        }
        Ok(page)
    }

    async fn upsert_topic(&self, topic: NewTopic) -> Result<Topic, DbError> {
        self.inner.upsert_topic(topic).await
    }

    async fn upsert_trend(&self, trend: NewTrend) -> Result<Trend, DbError> {
        self.inner.upsert_trend(trend).await
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<i64, DbError> {
        self.inner.insert_snapshot(snapshot).await
    }

    async fn find_latest_snapshot(
        &self,
        filter: SnapshotFilter,
    ) -> Result<Option<SnapshotRecord>, DbError> {
        self.inner.find_latest_snapshot(filter).await
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeCounts, DbError> {
        self.inner.purge_before(cutoff).await
    }

    async fn end_stale_trends(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        self.inner.end_stale_trends(cutoff).await
    }
}
