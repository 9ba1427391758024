//! Database operations for the `processed_items` table.
//!
//! Stage flags only ever move from `false` to `true`, and each flip is written
//! in the same statement as the annotation it guards.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sportrend_core::{
    EnrichedItem, Entity, NewProcessedItem, ProcessedItem, SentimentAnnotation, SentimentLabel,
    Stage,
};
use sqlx::PgPool;

use crate::repository::EnrichedFilter;
use crate::{raw_items, sql_limit, DbError};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `processed_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessedItemRow {
    pub id: i64,
    pub raw_item_id: i64,
    pub clean_text: String,
    pub normalized_text: String,
    pub tokens: Vec<String>,
    pub word_count: i32,
    pub char_count: i32,
    pub entities: Value,
    pub sentiment_label: Option<String>,
    pub sentiment_score: Option<f64>,
    pub is_analyzed_for_entities: bool,
    pub is_analyzed_for_sentiment: bool,
    pub is_valid: bool,
    pub processed_at: DateTime<Utc>,
}

impl TryFrom<ProcessedItemRow> for ProcessedItem {
    type Error = DbError;

    fn try_from(row: ProcessedItemRow) -> Result<Self, Self::Error> {
        let entities: Vec<Entity> = serde_json::from_value(row.entities)?;
        let sentiment = match row.sentiment_label {
            Some(label) => {
                let label = label
                    .parse::<SentimentLabel>()
                    .map_err(|e| DbError::Decode(format!("processed item {}: {e}", row.id)))?;
                Some(SentimentAnnotation::new(
                    label,
                    row.sentiment_score.unwrap_or(0.0),
                ))
            }
            None => None,
        };

        Ok(Self {
            id: row.id,
            raw_item_id: row.raw_item_id,
            clean_text: row.clean_text,
            normalized_text: row.normalized_text,
            tokens: row.tokens,
            word_count: row.word_count,
            char_count: row.char_count,
            entities,
            sentiment,
            is_analyzed_for_entities: row.is_analyzed_for_entities,
            is_analyzed_for_sentiment: row.is_analyzed_for_sentiment,
            is_valid: row.is_valid,
            processed_at: row.processed_at,
        })
    }
}

const PROCESSED_ITEM_COLUMNS: &str = "id, raw_item_id, clean_text, normalized_text, tokens, \
     word_count, char_count, entities, sentiment_label, sentiment_score, \
     is_analyzed_for_entities, is_analyzed_for_sentiment, is_valid, processed_at";

fn decode_rows(rows: Vec<ProcessedItemRow>) -> Result<Vec<ProcessedItem>, DbError> {
    rows.into_iter().map(ProcessedItem::try_from).collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert or refresh the processed record for a raw item.
///
/// On conflict only the text-derived columns change; flags and annotations stay.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_processed(
    pool: &PgPool,
    item: &NewProcessedItem,
) -> Result<ProcessedItem, DbError> {
    let row = sqlx::query_as::<_, ProcessedItemRow>(&format!(
        "INSERT INTO processed_items \
             (raw_item_id, clean_text, normalized_text, tokens, word_count, char_count, processed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (raw_item_id) DO UPDATE SET \
             clean_text = EXCLUDED.clean_text, \
             normalized_text = EXCLUDED.normalized_text, \
             tokens = EXCLUDED.tokens, \
             word_count = EXCLUDED.word_count, \
             char_count = EXCLUDED.char_count, \
             is_valid = TRUE \
         RETURNING {PROCESSED_ITEM_COLUMNS}"
    ))
    .bind(item.raw_item_id)
    .bind(&item.clean_text)
    .bind(&item.normalized_text)
    .bind(&item.tokens)
    .bind(item.word_count())
    .bind(item.char_count())
    .bind(item.processed_at)
    .fetch_one(pool)
    .await?;

    ProcessedItem::try_from(row)
}

/// Delete the processed record owned by a raw item, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_processed_for_raw(pool: &PgPool, raw_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM processed_items WHERE raw_item_id = $1")
        .bind(raw_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Lease pending items for a stage.
///
/// `FOR UPDATE SKIP LOCKED` keeps two concurrent claimers from selecting the
/// same rows; the lease column keeps them from re-selecting after commit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_pending(
    pool: &PgPool,
    stage: Stage,
    limit: usize,
    lease: Duration,
) -> Result<Vec<ProcessedItem>, DbError> {
    let (lease_column, pending_predicate) = match stage {
        Stage::Entities => ("entities_claimed_until", "NOT p.is_analyzed_for_entities"),
        Stage::Sentiment => (
            "sentiment_claimed_until",
            "p.is_analyzed_for_entities AND NOT p.is_analyzed_for_sentiment",
        ),
    };

    let rows = sqlx::query_as::<_, ProcessedItemRow>(&format!(
        "UPDATE processed_items SET {lease_column} = NOW() + make_interval(secs => $2) \
         WHERE id IN ( \
             SELECT p.id FROM processed_items p \
             WHERE p.is_valid AND {pending_predicate} \
               AND (p.{lease_column} IS NULL OR p.{lease_column} < NOW()) \
             ORDER BY p.id \
             LIMIT $1 \
             FOR UPDATE SKIP LOCKED) \
         RETURNING {PROCESSED_ITEM_COLUMNS}"
    ))
    .bind(sql_limit(limit))
    .bind(lease.as_secs_f64())
    .fetch_all(pool)
    .await?;

    let mut items = decode_rows(rows)?;
    items.sort_by_key(|item| item.id);
    Ok(items)
}

/// Write the entity list and set the entity flag, unless it is already set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn complete_entities(
    pool: &PgPool,
    id: i64,
    entities: &[Entity],
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE processed_items \
         SET entities = $2, is_analyzed_for_entities = TRUE, entities_claimed_until = NULL \
         WHERE id = $1 AND NOT is_analyzed_for_entities",
    )
    .bind(id)
    .bind(serde_json::to_value(entities)?)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Write the sentiment annotation and set the sentiment flag, unless it is already set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn complete_sentiment(
    pool: &PgPool,
    id: i64,
    sentiment: SentimentAnnotation,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE processed_items \
         SET sentiment_label = $2, sentiment_score = $3, \
             is_analyzed_for_sentiment = TRUE, sentiment_claimed_until = NULL \
         WHERE id = $1 AND NOT is_analyzed_for_sentiment",
    )
    .bind(id)
    .bind(sentiment.label.as_str())
    .bind(sentiment.score)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// One page of valid processed items joined with their raw items.
///
/// A raw item purged between the two reads drops its row, so a page can come
/// back shorter than `limit` with more rows still to follow.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails, or [`DbError::Decode`] if a
/// stored annotation cannot be decoded.
pub async fn list_enriched(
    pool: &PgPool,
    filter: &EnrichedFilter,
) -> Result<Vec<EnrichedItem>, DbError> {
    let rows = sqlx::query_as::<_, ProcessedItemRow>(&format!(
        "SELECT {PROCESSED_ITEM_COLUMNS} FROM processed_items \
         WHERE is_valid \
           AND id > $1 \
           AND ($2 = FALSE OR is_analyzed_for_entities) \
           AND ($3 = FALSE OR is_analyzed_for_sentiment) \
           AND ($4::timestamptz IS NULL OR processed_at >= $4) \
           AND ($5::timestamptz IS NULL OR processed_at < $5) \
           AND EXISTS (SELECT 1 FROM raw_items r WHERE r.id = processed_items.raw_item_id) \
         ORDER BY id \
         LIMIT $6"
    ))
    .bind(filter.after_id)
    .bind(filter.require_entities)
    .bind(filter.require_sentiment)
    .bind(filter.processed_from)
    .bind(filter.processed_before)
    .bind(sql_limit(filter.limit))
    .fetch_all(pool)
    .await?;

    let processed = decode_rows(rows)?;
    let raw_ids: Vec<i64> = processed.iter().map(|p| p.raw_item_id).collect();
    let mut raws: HashMap<i64, _> = raw_items::list_raw_by_ids(pool, &raw_ids)
        .await?
        .into_iter()
        .map(|raw| (raw.id, raw))
        .collect();

    Ok(processed
        .into_iter()
        .filter_map(|p| match raws.remove(&p.raw_item_id) {
            Some(raw) => Some(EnrichedItem { processed: p, raw }),
            None => {
                // Raw item purged between the two queries.
                tracing::warn!(
                    processed_id = p.id,
                    raw_item_id = p.raw_item_id,
                    "skipping orphaned processed item"
                );
                None
            }
        })
        .collect())
}
