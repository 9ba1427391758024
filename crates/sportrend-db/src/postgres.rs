use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sportrend_core::{
    EnrichedItem, Entity, NaturalKey, NewProcessedItem, NewRawItem, NewTopic, NewTrend,
    ProcessedItem, RawItem, SentimentAnnotation, Snapshot, SnapshotRecord, Stage, Topic, Trend,
};
use sqlx::PgPool;

use crate::repository::{EnrichedFilter, PurgeCounts, Repository, SnapshotFilter, UpsertOutcome};
use crate::{processed_items, raw_items, snapshots, trends, DbError};

/// [`Repository`] backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_raw_by_key(&self, key: &NaturalKey) -> Result<Option<RawItem>, DbError> {
        raw_items::find_raw_by_key(&self.pool, key).await
    }

    async fn insert_raw_if_absent(&self, item: NewRawItem) -> Result<UpsertOutcome, DbError> {
        raw_items::insert_raw_if_absent(&self.pool, &item).await
    }

    async fn list_unprocessed_raw(
        &self,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<RawItem>, DbError> {
        raw_items::list_unprocessed_raw(&self.pool, after_id, limit).await
    }

    async fn set_raw_processed(&self, raw_id: i64, processed: bool) -> Result<(), DbError> {
        raw_items::set_raw_processed(&self.pool, raw_id, processed).await
    }

    async fn upsert_processed(&self, item: NewProcessedItem) -> Result<ProcessedItem, DbError> {
        processed_items::upsert_processed(&self.pool, &item).await
    }

    async fn delete_processed_for_raw(&self, raw_id: i64) -> Result<bool, DbError> {
        processed_items::delete_processed_for_raw(&self.pool, raw_id).await
    }

    async fn claim_pending(
        &self,
        stage: Stage,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<ProcessedItem>, DbError> {
        processed_items::claim_pending(&self.pool, stage, limit, lease).await
    }

    async fn complete_entities(&self, id: i64, entities: Vec<Entity>) -> Result<bool, DbError> {
        processed_items::complete_entities(&self.pool, id, &entities).await
    }

    async fn complete_sentiment(
        &self,
        id: i64,
        sentiment: SentimentAnnotation,
    ) -> Result<bool, DbError> {
        processed_items::complete_sentiment(&self.pool, id, sentiment).await
    }

    async fn list_enriched(&self, filter: &EnrichedFilter) -> Result<Vec<EnrichedItem>, DbError> {
        processed_items::list_enriched(&self.pool, filter).await
    }

    async fn upsert_topic(&self, topic: NewTopic) -> Result<Topic, DbError> {
        trends::upsert_topic(&self.pool, &topic).await
    }

    async fn upsert_trend(&self, trend: NewTrend) -> Result<Trend, DbError> {
        trends::upsert_trend(&self.pool, &trend).await
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<i64, DbError> {
        snapshots::insert_snapshot(&self.pool, snapshot).await
    }

    async fn find_latest_snapshot(
        &self,
        filter: SnapshotFilter,
    ) -> Result<Option<SnapshotRecord>, DbError> {
        snapshots::find_latest_snapshot(&self.pool, filter).await
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeCounts, DbError> {
        snapshots::purge_before(&self.pool, cutoff).await
    }

    async fn end_stale_trends(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        trends::end_stale_trends(&self.pool, cutoff).await
    }
}
