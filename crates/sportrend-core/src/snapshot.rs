use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::annotations::{EntityType, SentimentLabel};
use crate::trends::{SentimentTally, TrendStatus};

/// Mentions on one calendar day (UTC). Serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub mentions: u64,
}

/// One ranked entry of the global trend list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub entity_text: String,
    pub entity_type: EntityType,
    pub count: u64,
    pub previous_count: u64,
    pub growth_rate: f64,
    pub status: TrendStatus,
    pub sentiment: SentimentTally,
    pub dominant_sport: String,
    pub daily_mentions: Vec<DayBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleItem {
    pub processed_item_id: i64,
    pub text: String,
    pub author_name: Option<String>,
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,
    pub date: DateTime<Utc>,
    pub sport_type: String,
}

/// The most-mentioned entity of one type within one sport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHighlight {
    pub text: String,
    pub entity_type: EntityType,
    pub count: u64,
    pub sentiment: SentimentTally,
    pub daily_mentions: Vec<DayBucket>,
    /// Up to five, newest first.
    pub samples: Vec<SampleItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportBreakdown {
    pub sport_type: String,
    pub total_items: u64,
    pub top_entities: BTreeMap<EntityType, EntityHighlight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEntity {
    pub text: String,
    pub entity_type: EntityType,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagCount {
    pub tag: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_items: u64,
    pub top_hashtag: Option<HashtagCount>,
    pub top_entities: BTreeMap<EntityType, TopEntity>,
    pub overall_sentiment: SentimentTally,
    /// Top 50 content tokens, most frequent first.
    pub word_frequencies: Vec<WordCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeDetail {
    pub entity_type: EntityType,
    pub total_mentions: u64,
    pub sentiment: SentimentTally,
    pub top_entity: Option<TopEntity>,
    pub daily_mentions: Vec<DayBucket>,
    pub samples: Vec<SampleItem>,
}

/// Result of one aggregation run. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub analysis_time: DateTime<Utc>,
    pub window_days: u32,
    pub entity_types: Vec<EntityType>,
    pub global_trends: Vec<TrendEntry>,
    pub sport_breakdown: BTreeMap<String, SportBreakdown>,
    pub dashboard: DashboardSummary,
    pub entity_details: BTreeMap<EntityType, EntityTypeDetail>,
}

impl Snapshot {
    #[must_use]
    pub fn entity_detail(&self, entity_type: EntityType) -> Option<&EntityTypeDetail> {
        self.entity_details.get(&entity_type)
    }

    #[must_use]
    pub fn sport(&self, sport_type: &str) -> Option<&SportBreakdown> {
        self.sport_breakdown.get(sport_type)
    }

    #[must_use]
    pub fn covers(&self, entity_type: EntityType) -> bool {
        self.entity_types.contains(&entity_type)
    }
}

/// A stored snapshot together with its storage id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: i64,
    pub snapshot: Snapshot,
}
