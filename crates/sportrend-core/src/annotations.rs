use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Category of a named entity recognised in an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Player,
    Team,
    Competition,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [
        EntityType::Player,
        EntityType::Team,
        EntityType::Competition,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Player => "PLAYER",
            EntityType::Team => "TEAM",
            EntityType::Competition => "COMPETITION",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAYER" => Ok(EntityType::Player),
            "TEAM" => Ok(EntityType::Team),
            "COMPETITION" => Ok(EntityType::Competition),
            other => Err(CoreError::InvalidEntityType(other.to_string())),
        }
    }
}

/// Character offsets (`start..end`, in chars) of an entity within the analysed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// An entity annotation. Written once by the entity stage and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub span: Span,
    /// Extractor confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    /// Marker written when scoring failed; the item is done and never retried.
    Error,
}

impl SentimentLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Error => "error",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" => Ok(SentimentLabel::Negative),
            "error" => Ok(SentimentLabel::Error),
            other => Err(CoreError::InvalidSentimentLabel(other.to_string())),
        }
    }
}

/// Sentiment annotation attached once by the sentiment stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnnotation {
    pub label: SentimentLabel,
    /// Confidence of `label` in `[0.0, 1.0]`.
    pub score: f64,
}

impl SentimentAnnotation {
    /// Build an annotation, clamping `score` into `[0.0, 1.0]`.
    #[must_use]
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        Self { label, score }
    }

    #[must_use]
    pub fn error() -> Self {
        Self {
            label: SentimentLabel::Error,
            score: 0.0,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.label == SentimentLabel::Error
    }
}
