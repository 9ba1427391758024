//! Database operations for the `topics` and `trends` tables.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sportrend_core::{
    EntityRef, NewTopic, NewTrend, SentimentTally, Topic, Trend, TrendMetrics, TrendStatus,
};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `topics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopicRow {
    pub id: i64,
    pub name: String,
    pub keywords: Vec<String>,
    pub related_entities: Value,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl TryFrom<TopicRow> for Topic {
    type Error = DbError;

    fn try_from(row: TopicRow) -> Result<Self, Self::Error> {
        let related_entities: Vec<EntityRef> = serde_json::from_value(row.related_entities)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            keywords: row.keywords,
            related_entities,
            created_at: row.created_at,
            last_updated: row.last_updated,
        })
    }
}

/// A row from the `trends` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendRow {
    pub id: i64,
    pub topic_name: String,
    pub comment_count: i64,
    pub growth_rate: f64,
    pub sentiment_distribution: Value,
    pub status: String,
    pub detection_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl TryFrom<TrendRow> for Trend {
    type Error = DbError;

    fn try_from(row: TrendRow) -> Result<Self, Self::Error> {
        let sentiment_distribution: SentimentTally =
            serde_json::from_value(row.sentiment_distribution)?;
        let status = row.status.parse::<TrendStatus>()?;
        Ok(Self {
            id: row.id,
            topic_name: row.topic_name,
            metrics: TrendMetrics {
                comment_count: u64::try_from(row.comment_count).unwrap_or(0),
                growth_rate: row.growth_rate,
            },
            sentiment_distribution,
            status,
            detection_time: row.detection_time,
            last_updated: row.last_updated,
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upsert a topic by name. `created_at` is only written on first insert.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_topic(pool: &PgPool, topic: &NewTopic) -> Result<Topic, DbError> {
    let row = sqlx::query_as::<_, TopicRow>(
        "INSERT INTO topics (name, keywords, related_entities) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (name) DO UPDATE SET \
             keywords = EXCLUDED.keywords, \
             related_entities = EXCLUDED.related_entities, \
             last_updated = NOW() \
         RETURNING id, name, keywords, related_entities, created_at, last_updated",
    )
    .bind(&topic.name)
    .bind(&topic.keywords)
    .bind(serde_json::to_value(&topic.related_entities)?)
    .fetch_one(pool)
    .await?;

    Topic::try_from(row)
}

/// Upsert a trend by topic name. `detection_time` is only written on first insert.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_trend(pool: &PgPool, trend: &NewTrend) -> Result<Trend, DbError> {
    let row = sqlx::query_as::<_, TrendRow>(
        "INSERT INTO trends \
             (topic_name, comment_count, growth_rate, sentiment_distribution, status) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (topic_name) DO UPDATE SET \
             comment_count = EXCLUDED.comment_count, \
             growth_rate = EXCLUDED.growth_rate, \
             sentiment_distribution = EXCLUDED.sentiment_distribution, \
             status = EXCLUDED.status, \
             last_updated = NOW() \
         RETURNING id, topic_name, comment_count, growth_rate, sentiment_distribution, \
                   status, detection_time, last_updated",
    )
    .bind(&trend.topic_name)
    .bind(i64::try_from(trend.metrics.comment_count).unwrap_or(i64::MAX))
    .bind(trend.metrics.growth_rate)
    .bind(serde_json::to_value(&trend.sentiment_distribution)?)
    .bind(trend.status.as_str())
    .fetch_one(pool)
    .await?;

    Trend::try_from(row)
}

/// Mark trends not updated since `cutoff` as ended.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn end_stale_trends(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE trends SET status = 'ended' \
         WHERE last_updated < $1 AND status <> 'ended'",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
