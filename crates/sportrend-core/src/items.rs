use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::annotations::{Entity, SentimentAnnotation};
use crate::CoreError;

/// Business identity of a feed item: the feed it came from plus that feed's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub source: String,
    pub source_id: String,
}

impl NaturalKey {
    #[must_use]
    pub fn new(source: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_id: source_id.into(),
        }
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.source_id)
    }
}

/// A collected item as stored. Immutable after insertion except `is_processed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
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
    /// Originating category (the sport the collecting query targeted).
    pub sport_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub is_processed: bool,
}

impl RawItem {
    #[must_use]
    pub fn key(&self) -> NaturalKey {
        NaturalKey::new(&self.source, &self.source_id)
    }

    #[must_use]
    pub fn sport_type_or_unknown(&self) -> &str {
        self.sport_type.as_deref().unwrap_or(crate::UNKNOWN_SPORT)
    }
}

/// Input to the repository's insert-if-absent for raw items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRawItem {
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
}

impl NewRawItem {
    #[must_use]
    pub fn key(&self) -> NaturalKey {
        NaturalKey::new(&self.source, &self.source_id)
    }

    /// Reject records that cannot be keyed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `source` or `source_id` is blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.source.trim().is_empty() {
            return Err(CoreError::Validation("raw item source must be non-empty".into()));
        }
        if self.source_id.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "raw item from '{}' has an empty source_id",
                self.source
            )));
        }
        Ok(())
    }
}

/// Enrichment stages that annotate processed items in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Entities,
    Sentiment,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Entities => "entities",
            Stage::Sentiment => "sentiment",
        }
    }

    /// The stage that must already be done before this one may claim an item.
    #[must_use]
    pub fn prerequisite(self) -> Option<Stage> {
        match self {
            Stage::Entities => None,
            Stage::Sentiment => Some(Stage::Entities),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized, enrichable counterpart of exactly one [`RawItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedItem {
    pub id: i64,
    pub raw_item_id: i64,
    pub clean_text: String,
    pub normalized_text: String,
    pub tokens: Vec<String>,
    pub word_count: i32,
    pub char_count: i32,
    pub entities: Vec<Entity>,
    pub sentiment: Option<SentimentAnnotation>,
    pub is_analyzed_for_entities: bool,
    pub is_analyzed_for_sentiment: bool,
    pub is_valid: bool,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedItem {
    #[must_use]
    pub fn is_done(&self, stage: Stage) -> bool {
        match stage {
            Stage::Entities => self.is_analyzed_for_entities,
            Stage::Sentiment => self.is_analyzed_for_sentiment,
        }
    }
}

/// Normalizer output, keyed by the owning raw item.
///
/// Word and char counts are derived from the text so they cannot disagree with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProcessedItem {
    pub raw_item_id: i64,
    pub clean_text: String,
    pub normalized_text: String,
    pub tokens: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

impl NewProcessedItem {
    #[must_use]
    pub fn word_count(&self) -> i32 {
        i32::try_from(self.tokens.len()).unwrap_or(i32::MAX)
    }

    #[must_use]
    pub fn char_count(&self) -> i32 {
        i32::try_from(self.clean_text.chars().count()).unwrap_or(i32::MAX)
    }
}

/// A processed item joined with the raw item that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub processed: ProcessedItem,
    pub raw: RawItem,
}
