//! Database operations for the `raw_items` table.

use chrono::{DateTime, Utc};
use sportrend_core::{NaturalKey, NewRawItem, RawItem};
use sqlx::PgPool;

use crate::repository::UpsertOutcome;
use crate::{sql_limit, DbError};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `raw_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawItemRow {
    pub id: i64,
    pub source: String,
    pub source_id: String,
    pub content: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub author_followers: Option<i64>,
    pub author_verified: bool,
    pub likes: i64,
    pub shares: i64,
    pub comments: i64,
    pub language: String,
    pub hashtags: Vec<String>,
    pub sport_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub is_processed: bool,
}

impl From<RawItemRow> for RawItem {
    fn from(row: RawItemRow) -> Self {
        Self {
            id: row.id,
            source: row.source,
            source_id: row.source_id,
            content: row.content,
            author_id: row.author_id,
            author_name: row.author_name,
            author_followers: row.author_followers,
            author_verified: row.author_verified,
            likes: row.likes,
            shares: row.shares,
            comments: row.comments,
            language: row.language,
            hashtags: row.hashtags,
            sport_type: row.sport_type,
            created_at: row.created_at,
            collected_at: row.collected_at,
            is_processed: row.is_processed,
        }
    }
}

pub(crate) const RAW_ITEM_COLUMNS: &str = "id, source, source_id, content, author_id, \
     author_name, author_followers, author_verified, likes, shares, comments, language, \
     hashtags, sport_type, created_at, collected_at, is_processed";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Look up a raw item by `(source, source_id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_raw_by_key(pool: &PgPool, key: &NaturalKey) -> Result<Option<RawItem>, DbError> {
    let row = sqlx::query_as::<_, RawItemRow>(&format!(
        "SELECT {RAW_ITEM_COLUMNS} FROM raw_items WHERE source = $1 AND source_id = $2"
    ))
    .bind(&key.source)
    .bind(&key.source_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(RawItem::from))
}

/// Insert a raw item, leaving an existing row with the same natural key untouched.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for an unkeyable item, or [`DbError::Sqlx`]
/// if either statement fails.
pub async fn insert_raw_if_absent(
    pool: &PgPool,
    item: &NewRawItem,
) -> Result<UpsertOutcome, DbError> {
    item.validate()?;

    let inserted: Option<i64> = sqlx::query_scalar(
        "INSERT INTO raw_items \
             (source, source_id, content, author_id, author_name, author_followers, \
              author_verified, likes, shares, comments, language, hashtags, sport_type, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (source, source_id) DO NOTHING \
         RETURNING id",
    )
    .bind(&item.source)
    .bind(&item.source_id)
    .bind(&item.content)
    .bind(&item.author_id)
    .bind(&item.author_name)
    .bind(item.author_followers)
    .bind(item.author_verified)
    .bind(item.likes)
    .bind(item.shares)
    .bind(item.comments)
    .bind(&item.language)
    .bind(&item.hashtags)
    .bind(&item.sport_type)
    .bind(item.created_at)
    .fetch_optional(pool)
    .await?;

    if let Some(id) = inserted {
        return Ok(UpsertOutcome::Inserted(id));
    }

    let existing: i64 =
        sqlx::query_scalar("SELECT id FROM raw_items WHERE source = $1 AND source_id = $2")
            .bind(&item.source)
            .bind(&item.source_id)
            .fetch_one(pool)
            .await?;

    Ok(UpsertOutcome::Existing(existing))
}

/// List unprocessed raw items after `after_id`, ascending by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unprocessed_raw(
    pool: &PgPool,
    after_id: i64,
    limit: usize,
) -> Result<Vec<RawItem>, DbError> {
    let rows = sqlx::query_as::<_, RawItemRow>(&format!(
        "SELECT {RAW_ITEM_COLUMNS} FROM raw_items \
         WHERE NOT is_processed AND id > $1 \
         ORDER BY id \
         LIMIT $2"
    ))
    .bind(after_id)
    .bind(sql_limit(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RawItem::from).collect())
}

/// Fetch raw items by id. Missing ids are silently absent from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_raw_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<RawItem>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, RawItemRow>(&format!(
        "SELECT {RAW_ITEM_COLUMNS} FROM raw_items WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RawItem::from).collect())
}

/// Set the `is_processed` flag of a raw item.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has that id, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_raw_processed(pool: &PgPool, raw_id: i64, processed: bool) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE raw_items SET is_processed = $2 WHERE id = $1")
        .bind(raw_id)
        .bind(processed)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
