//! In-memory [`Repository`] for tests and local dry runs. No database required.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sportrend_core::{
    EnrichedItem, Entity, NaturalKey, NewProcessedItem, NewRawItem, NewTopic, NewTrend,
    ProcessedItem, RawItem, SentimentAnnotation, Snapshot, SnapshotRecord, Stage, Topic, Trend,
    TrendStatus,
};

use crate::repository::{EnrichedFilter, PurgeCounts, Repository, SnapshotFilter, UpsertOutcome};
use crate::DbError;

#[derive(Debug, Clone)]
struct StoredProcessed {
    item: ProcessedItem,
    entities_lease: Option<DateTime<Utc>>,
    sentiment_lease: Option<DateTime<Utc>>,
}

impl StoredProcessed {
    fn lease_mut(&mut self, stage: Stage) -> &mut Option<DateTime<Utc>> {
        match stage {
            Stage::Entities => &mut self.entities_lease,
            Stage::Sentiment => &mut self.sentiment_lease,
        }
    }

    fn is_claimable(&self, stage: Stage, now: DateTime<Utc>) -> bool {
        let pending = !self.item.is_done(stage)
            && stage
                .prerequisite()
                .is_none_or(|prerequisite| self.item.is_done(prerequisite));
        let lease = match stage {
            Stage::Entities => self.entities_lease,
            Stage::Sentiment => self.sentiment_lease,
        };
        self.item.is_valid && pending && lease.is_none_or(|until| until < now)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    raw: BTreeMap<i64, RawItem>,
    raw_keys: HashMap<NaturalKey, i64>,
    processed: BTreeMap<i64, StoredProcessed>,
    processed_by_raw: HashMap<i64, i64>,
    topics: BTreeMap<String, Topic>,
    trends: BTreeMap<String, Trend>,
    snapshots: Vec<SnapshotRecord>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Thread-safe, process-local repository with the same semantics as
/// [`crate::PgRepository`], including claim leases.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All stored raw items, ascending by id.
    #[must_use]
    pub fn raw_items(&self) -> Vec<RawItem> {
        self.lock().raw.values().cloned().collect()
    }

    /// All stored processed items, ascending by id.
    #[must_use]
    pub fn processed_items(&self) -> Vec<ProcessedItem> {
        self.lock()
            .processed
            .values()
            .map(|stored| stored.item.clone())
            .collect()
    }

    #[must_use]
    pub fn processed_for_raw(&self, raw_id: i64) -> Option<ProcessedItem> {
        let state = self.lock();
        state
            .processed_by_raw
            .get(&raw_id)
            .and_then(|id| state.processed.get(id))
            .map(|stored| stored.item.clone())
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<SnapshotRecord> {
        self.lock().snapshots.clone()
    }

    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.lock().topics.values().cloned().collect()
    }

    #[must_use]
    pub fn trends(&self) -> Vec<Trend> {
        self.lock().trends.values().cloned().collect()
    }
}

fn lease_delta(lease: Duration) -> TimeDelta {
    TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX)
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_raw_by_key(&self, key: &NaturalKey) -> Result<Option<RawItem>, DbError> {
        let state = self.lock();
        Ok(state
            .raw_keys
            .get(key)
            .and_then(|id| state.raw.get(id))
            .cloned())
    }

    async fn insert_raw_if_absent(&self, item: NewRawItem) -> Result<UpsertOutcome, DbError> {
        item.validate()?;
        let key = item.key();
        let mut state = self.lock();
        if let Some(&id) = state.raw_keys.get(&key) {
            return Ok(UpsertOutcome::Existing(id));
        }

        let id = state.allocate_id();
        let raw = RawItem {
            id,
            source: item.source,
            source_id: item.source_id,
            content: item.content,
            author_id: item.author_id,
            author_name: item.author_name,
            author_followers: item.author_followers,
            author_verified: item.author_verified,
            likes: item.likes,
            shares: item.shares,
            comments: item.comments,
            language: item.language,
            hashtags: item.hashtags,
            sport_type: item.sport_type,
            created_at: item.created_at,
            collected_at: Utc::now(),
            is_processed: false,
        };
        state.raw_keys.insert(key, id);
        state.raw.insert(id, raw);
        Ok(UpsertOutcome::Inserted(id))
    }

    async fn list_unprocessed_raw(
        &self,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<RawItem>, DbError> {
        let state = self.lock();
        Ok(state
            .raw
            .range(after_id.saturating_add(1)..)
            .map(|(_, raw)| raw)
            .filter(|raw| !raw.is_processed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn set_raw_processed(&self, raw_id: i64, processed: bool) -> Result<(), DbError> {
        let mut state = self.lock();
        let raw = state.raw.get_mut(&raw_id).ok_or(DbError::NotFound)?;
        raw.is_processed = processed;
        Ok(())
    }

    async fn upsert_processed(&self, item: NewProcessedItem) -> Result<ProcessedItem, DbError> {
        let mut state = self.lock();
        if !state.raw.contains_key(&item.raw_item_id) {
            return Err(DbError::NotFound);
        }

        if let Some(&id) = state.processed_by_raw.get(&item.raw_item_id) {
            let stored = state.processed.get_mut(&id).ok_or(DbError::NotFound)?;
            stored.item.word_count = item.word_count();
            stored.item.char_count = item.char_count();
            stored.item.clean_text = item.clean_text;
            stored.item.normalized_text = item.normalized_text;
            stored.item.tokens = item.tokens;
            stored.item.is_valid = true;
            return Ok(stored.item.clone());
        }

        let id = state.allocate_id();
        let processed = ProcessedItem {
            id,
            raw_item_id: item.raw_item_id,
            word_count: item.word_count(),
            char_count: item.char_count(),
            clean_text: item.clean_text,
            normalized_text: item.normalized_text,
            tokens: item.tokens,
            entities: Vec::new(),
            sentiment: None,
            is_analyzed_for_entities: false,
            is_analyzed_for_sentiment: false,
            is_valid: true,
            processed_at: item.processed_at,
        };
        state.processed_by_raw.insert(processed.raw_item_id, id);
        state.processed.insert(
            id,
            StoredProcessed {
                item: processed.clone(),
                entities_lease: None,
                sentiment_lease: None,
            },
        );
        Ok(processed)
    }

    async fn delete_processed_for_raw(&self, raw_id: i64) -> Result<bool, DbError> {
        let mut state = self.lock();
        match state.processed_by_raw.remove(&raw_id) {
            Some(id) => Ok(state.processed.remove(&id).is_some()),
            None => Ok(false),
        }
    }

    async fn claim_pending(
        &self,
        stage: Stage,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<ProcessedItem>, DbError> {
        let now = Utc::now();
        let until = now + lease_delta(lease);
        let mut state = self.lock();
        Ok(state
            .processed
            .values_mut()
            .filter(|stored| stored.is_claimable(stage, now))
            .take(limit)
            .map(|stored| {
                *stored.lease_mut(stage) = Some(until);
                stored.item.clone()
            })
            .collect())
    }

    async fn complete_entities(&self, id: i64, entities: Vec<Entity>) -> Result<bool, DbError> {
        let mut state = self.lock();
        let stored = state.processed.get_mut(&id).ok_or(DbError::NotFound)?;
        if stored.item.is_analyzed_for_entities {
            return Ok(false);
        }
        stored.item.entities = entities;
        stored.item.is_analyzed_for_entities = true;
        stored.entities_lease = None;
        Ok(true)
    }

    async fn complete_sentiment(
        &self,
        id: i64,
        sentiment: SentimentAnnotation,
    ) -> Result<bool, DbError> {
        let mut state = self.lock();
        let stored = state.processed.get_mut(&id).ok_or(DbError::NotFound)?;
        if stored.item.is_analyzed_for_sentiment {
            return Ok(false);
        }
        stored.item.sentiment = Some(sentiment);
        stored.item.is_analyzed_for_sentiment = true;
        stored.sentiment_lease = None;
        Ok(true)
    }

    async fn list_enriched(&self, filter: &EnrichedFilter) -> Result<Vec<EnrichedItem>, DbError> {
        let state = self.lock();
        Ok(state
            .processed
            .range(filter.after_id.saturating_add(1)..)
            .map(|(_, stored)| &stored.item)
            .filter(|p| p.is_valid)
            .filter(|p| !filter.require_entities || p.is_analyzed_for_entities)
            .filter(|p| !filter.require_sentiment || p.is_analyzed_for_sentiment)
            .filter(|p| filter.processed_from.is_none_or(|from| p.processed_at >= from))
            .filter(|p| {
                filter
                    .processed_before
                    .is_none_or(|before| p.processed_at < before)
            })
            .filter_map(|p| {
                state.raw.get(&p.raw_item_id).map(|raw| EnrichedItem {
                    processed: p.clone(),
                    raw: raw.clone(),
                })
            })
            .take(filter.limit)
            .collect())
    }

    async fn upsert_topic(&self, topic: NewTopic) -> Result<Topic, DbError> {
        let now = Utc::now();
        let mut state = self.lock();
        let existing = state
            .topics
            .get(&topic.name)
            .map(|existing| (existing.id, existing.created_at));
        let (id, created_at) = match existing {
            Some(found) => found,
            None => (state.allocate_id(), now),
        };
        let stored = Topic {
            id,
            name: topic.name.clone(),
            keywords: topic.keywords,
            related_entities: topic.related_entities,
            created_at,
            last_updated: now,
        };
        state.topics.insert(topic.name, stored.clone());
        Ok(stored)
    }

    async fn upsert_trend(&self, trend: NewTrend) -> Result<Trend, DbError> {
        let now = Utc::now();
        let mut state = self.lock();
        let existing = state
            .trends
            .get(&trend.topic_name)
            .map(|existing| (existing.id, existing.detection_time));
        let (id, detection_time) = match existing {
            Some(found) => found,
            None => (state.allocate_id(), now),
        };
        let stored = Trend {
            id,
            topic_name: trend.topic_name.clone(),
            metrics: trend.metrics,
            sentiment_distribution: trend.sentiment_distribution,
            status: trend.status,
            detection_time,
            last_updated: now,
        };
        state.trends.insert(trend.topic_name, stored.clone());
        Ok(stored)
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<i64, DbError> {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.snapshots.push(SnapshotRecord {
            id,
            snapshot: snapshot.clone(),
        });
        Ok(id)
    }

    async fn find_latest_snapshot(
        &self,
        filter: SnapshotFilter,
    ) -> Result<Option<SnapshotRecord>, DbError> {
        let state = self.lock();
        Ok(state
            .snapshots
            .iter()
            .filter(|record| {
                filter
                    .entity_type
                    .is_none_or(|entity_type| record.snapshot.covers(entity_type))
            })
            .max_by_key(|record| (record.snapshot.analysis_time, record.id))
            .cloned())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeCounts, DbError> {
        let mut state = self.lock();
        let doomed: Vec<i64> = state
            .raw
            .values()
            .filter(|raw| raw.created_at < cutoff)
            .map(|raw| raw.id)
            .collect();

        let mut counts = PurgeCounts::default();
        for raw_id in doomed {
            if let Some(raw) = state.raw.remove(&raw_id) {
                state.raw_keys.remove(&raw.key());
                counts.raw_items += 1;
            }
            if let Some(processed_id) = state.processed_by_raw.remove(&raw_id) {
                if state.processed.remove(&processed_id).is_some() {
                    counts.processed_items += 1;
                }
            }
        }

        let newest = state
            .snapshots
            .iter()
            .max_by_key(|record| (record.snapshot.analysis_time, record.id))
            .map(|record| record.id);
        let before = state.snapshots.len();
        state
            .snapshots
            .retain(|record| record.snapshot.analysis_time >= cutoff || Some(record.id) == newest);
        counts.snapshots = u64::try_from(before - state.snapshots.len()).unwrap_or(0);

        Ok(counts)
    }

    async fn end_stale_trends(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut state = self.lock();
        let mut ended = 0;
        for trend in state.trends.values_mut() {
            if trend.last_updated < cutoff && trend.status != TrendStatus::Ended {
                trend.status = TrendStatus::Ended;
                ended += 1;
            }
        }
        Ok(ended)
    }
}
