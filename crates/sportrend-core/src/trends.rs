use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::annotations::{EntityType, SentimentLabel};
use crate::CoreError;

/// Lifecycle of a trend. `Ended` is only ever set by the retention job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStatus {
    Emerging,
    Peaking,
    Declining,
    Ended,
}

impl TrendStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrendStatus::Emerging => "emerging",
            TrendStatus::Peaking => "peaking",
            TrendStatus::Declining => "declining",
            TrendStatus::Ended => "ended",
        }
    }
}

impl std::fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emerging" => Ok(TrendStatus::Emerging),
            "peaking" => Ok(TrendStatus::Peaking),
            "declining" => Ok(TrendStatus::Declining),
            "ended" => Ok(TrendStatus::Ended),
            other => Err(CoreError::InvalidTrendStatus(other.to_string())),
        }
    }
}

/// Count of items per sentiment label plus the mean confidence of the scored ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    /// Items whose scoring failed. Excluded from `average_score`.
    pub error: u64,
    pub average_score: f64,
}

impl SentimentTally {
    /// Number of items that received a real label.
    #[must_use]
    pub fn scored(&self) -> u64 {
        self.positive + self.neutral + self.negative
    }

    #[must_use]
    pub fn count_for(&self, label: SentimentLabel) -> u64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Error => self.error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMetrics {
    pub comment_count: u64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

/// A named subject of discussion, upserted by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub keywords: Vec<String>,
    pub related_entities: Vec<EntityRef>,
    /// Set on first insert and preserved by every later upsert.
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTopic {
    pub name: String,
    pub keywords: Vec<String>,
    pub related_entities: Vec<EntityRef>,
}

/// Latest derived metrics for a topic, upserted by `topic_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub id: i64,
    pub topic_name: String,
    pub metrics: TrendMetrics,
    pub sentiment_distribution: SentimentTally,
    pub status: TrendStatus,
    /// Set on first insert and preserved by every later upsert.
    pub detection_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrend {
    pub topic_name: String,
    pub metrics: TrendMetrics,
    pub sentiment_distribution: SentimentTally,
    pub status: TrendStatus,
}
