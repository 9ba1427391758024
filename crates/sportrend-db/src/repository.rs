//! The storage contract every pipeline component is written against.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sportrend_core::{
    EnrichedItem, Entity, EntityType, NaturalKey, NewProcessedItem, NewRawItem, NewTopic,
    NewTrend, ProcessedItem, RawItem, SentimentAnnotation, Snapshot, SnapshotRecord, Stage, Topic,
    Trend,
};

use crate::DbError;

/// Result of inserting a raw item by natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    /// The key was already stored; the stored row was left untouched.
    Existing(i64),
}

impl UpsertOutcome {
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            UpsertOutcome::Inserted(id) | UpsertOutcome::Existing(id) => id,
        }
    }

    #[must_use]
    pub fn is_inserted(self) -> bool {
        matches!(self, UpsertOutcome::Inserted(_))
    }
}

/// Selection of valid processed items joined with their raw items.
///
/// Results are ordered by processed item id and start strictly after `after_id`,
/// so callers page by feeding back the last id they saw.
#[derive(Debug, Clone)]
pub struct EnrichedFilter {
    pub require_entities: bool,
    pub require_sentiment: bool,
    /// Inclusive lower bound on `processed_at`.
    pub processed_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `processed_at`.
    pub processed_before: Option<DateTime<Utc>>,
    pub after_id: i64,
    pub limit: usize,
}

impl EnrichedFilter {
    /// Items with both enrichment stages done, processed in `[from, before)`.
    #[must_use]
    pub fn fully_enriched(from: DateTime<Utc>, before: DateTime<Utc>, limit: usize) -> Self {
        Self {
            require_entities: true,
            require_sentiment: true,
            processed_from: Some(from),
            processed_before: Some(before),
            after_id: 0,
            limit,
        }
    }

    /// Every valid item regardless of enrichment progress.
    #[must_use]
    pub fn all_valid(limit: usize) -> Self {
        Self {
            require_entities: false,
            require_sentiment: false,
            processed_from: None,
            processed_before: None,
            after_id: 0,
            limit,
        }
    }

    /// Same filter, positioned after `last_id`.
    #[must_use]
    pub fn after(&self, last_id: i64) -> Self {
        Self {
            after_id: last_id,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    /// Only snapshots whose aggregation covered this entity type.
    pub entity_type: Option<EntityType>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub raw_items: u64,
    pub processed_items: u64,
    pub snapshots: u64,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_raw_by_key(&self, key: &NaturalKey) -> Result<Option<RawItem>, DbError>;

    /// Insert a raw item unless its natural key is already stored.
    async fn insert_raw_if_absent(&self, item: NewRawItem) -> Result<UpsertOutcome, DbError>;

    /// Unprocessed raw items with `id > after_id`, ascending by id.
    async fn list_unprocessed_raw(
        &self,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<RawItem>, DbError>;

    async fn set_raw_processed(&self, raw_id: i64, processed: bool) -> Result<(), DbError>;

    /// Write the processed record for a raw item, replacing its text fields if one exists.
    ///
    /// Enrichment flags and annotations of an existing record are preserved.
    async fn upsert_processed(&self, item: NewProcessedItem) -> Result<ProcessedItem, DbError>;

    /// Returns `true` if a processed record existed and was removed.
    async fn delete_processed_for_raw(&self, raw_id: i64) -> Result<bool, DbError>;

    /// Atomically lease up to `limit` valid items still pending `stage`.
    ///
    /// Items already leased by another caller (lease not yet expired) are skipped.
    /// Sentiment claims only return items whose entity stage is done.
    async fn claim_pending(
        &self,
        stage: Stage,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<ProcessedItem>, DbError>;

    /// Write entities and flip the entity flag. `false` if the flag was already set.
    async fn complete_entities(&self, id: i64, entities: Vec<Entity>) -> Result<bool, DbError>;

    /// Write sentiment and flip the sentiment flag. `false` if the flag was already set.
    async fn complete_sentiment(
        &self,
        id: i64,
        sentiment: SentimentAnnotation,
    ) -> Result<bool, DbError>;

    async fn list_enriched(&self, filter: &EnrichedFilter) -> Result<Vec<EnrichedItem>, DbError>;

    /// Upsert by name, preserving `created_at`.
    async fn upsert_topic(&self, topic: NewTopic) -> Result<Topic, DbError>;

    /// Upsert by topic name, preserving `detection_time`.
    async fn upsert_trend(&self, trend: NewTrend) -> Result<Trend, DbError>;

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<i64, DbError>;

    /// Newest snapshot by `analysis_time`, then id.
    async fn find_latest_snapshot(
        &self,
        filter: SnapshotFilter,
    ) -> Result<Option<SnapshotRecord>, DbError>;

    /// Delete raw items created before `cutoff` (with their processed items) and
    /// snapshots analysed before it, always keeping the newest snapshot.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeCounts, DbError>;

    /// Mark trends not updated since `cutoff` as ended. Returns how many changed.
    async fn end_stale_trends(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError>;
}
