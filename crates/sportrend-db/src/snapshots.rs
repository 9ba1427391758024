//! Database operations for the `trend_snapshots` table and retention purges.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sportrend_core::{Snapshot, SnapshotRecord};
use sqlx::PgPool;

use crate::repository::{PurgeCounts, SnapshotFilter};
use crate::DbError;

/// A row from the `trend_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub analysis_time: DateTime<Utc>,
    pub document: Value,
}

impl TryFrom<SnapshotRow> for SnapshotRecord {
    type Error = DbError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let snapshot: Snapshot = serde_json::from_value(row.document)?;
        Ok(Self {
            id: row.id,
            snapshot,
        })
    }
}

/// Insert a snapshot document and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Json`] if the snapshot cannot be serialized, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_snapshot(pool: &PgPool, snapshot: &Snapshot) -> Result<i64, DbError> {
    let entity_types: Vec<&str> = snapshot.entity_types.iter().map(|t| t.as_str()).collect();

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO trend_snapshots (analysis_time, window_days, entity_types, document) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(snapshot.analysis_time)
    .bind(i32::try_from(snapshot.window_days).unwrap_or(i32::MAX))
    .bind(&entity_types)
    .bind(serde_json::to_value(snapshot)?)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Return the newest snapshot matching `filter`, or `None` if there is none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Json`] if the
/// stored document no longer decodes.
pub async fn find_latest_snapshot(
    pool: &PgPool,
    filter: SnapshotFilter,
) -> Result<Option<SnapshotRecord>, DbError> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, analysis_time, document FROM trend_snapshots \
         WHERE ($1::text IS NULL OR $1 = ANY(entity_types)) \
         ORDER BY analysis_time DESC, id DESC \
         LIMIT 1",
    )
    .bind(filter.entity_type.map(|t| t.as_str()))
    .fetch_optional(pool)
    .await?;

    row.map(SnapshotRecord::try_from).transpose()
}

/// Delete raw items created before `cutoff` and snapshots analysed before it.
///
/// Runs in one transaction. Processed items go with their raw items through
/// `ON DELETE CASCADE`. The newest snapshot is always kept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is deleted then.
pub async fn purge_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<PurgeCounts, DbError> {
    let mut tx = pool.begin().await?;

    let processed_items: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM processed_items p \
         JOIN raw_items r ON r.id = p.raw_item_id \
         WHERE r.created_at < $1",
    )
    .bind(cutoff)
    .fetch_one(&mut *tx)
    .await?;

    let raw_items = sqlx::query("DELETE FROM raw_items WHERE created_at < $1")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let snapshots = sqlx::query(
        "DELETE FROM trend_snapshots \
         WHERE analysis_time < $1 \
           AND id <> (SELECT id FROM trend_snapshots ORDER BY analysis_time DESC, id DESC LIMIT 1)",
    )
    .bind(cutoff)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    Ok(PurgeCounts {
        raw_items,
        processed_items: u64::try_from(processed_items).unwrap_or(0),
        snapshots,
    })
}
