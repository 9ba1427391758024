//! HTTP client for a transformer model server exposing `/ner` and `/sentiment`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sportrend_core::text::canonicalize;
use sportrend_core::{AppConfig, Entity, EntityType, SentimentAnnotation, SentimentLabel, Span};

use crate::error::EnrichError;
use crate::traits::{EntityExtractor, SentimentScorer};

/// Maximum number of texts per model call.
const BATCH_SIZE: usize = 32;

#[derive(Serialize)]
struct InputsRequest<'a> {
    inputs: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct NerSpan {
    #[serde(alias = "entity")]
    entity_group: String,
    word: String,
    start: usize,
    end: usize,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Map a token-classification label (`B-PER`, `I-ORG`, `LOC`, ...) onto an entity type.
#[must_use]
pub fn map_ner_label(label: &str) -> Option<EntityType> {
    let tag = label
        .strip_prefix("B-")
        .or_else(|| label.strip_prefix("I-"))
        .unwrap_or(label);
    if tag.ends_with("PER") {
        Some(EntityType::Player)
    } else if tag.ends_with("ORG") {
        Some(EntityType::Team)
    } else if tag.ends_with("LOC") {
        Some(EntityType::Competition)
    } else {
        None
    }
}

/// Map a classifier label onto a sentiment label.
///
/// `LABEL_0`/`LABEL_1`/`LABEL_2` are the fine-tuned classifier's negative,
/// positive and neutral classes.
#[must_use]
pub fn map_sentiment_label(label: &str) -> Option<SentimentLabel> {
    match label.trim().to_ascii_lowercase().as_str() {
        "label_0" | "negative" => Some(SentimentLabel::Negative),
        "label_1" | "positive" => Some(SentimentLabel::Positive),
        "label_2" | "neutral" => Some(SentimentLabel::Neutral),
        _ => None,
    }
}

/// Client for the model server. Implements both enrichment traits.
pub struct ModelClient {
    client: Client,
    base_url: Url,
}

impl ModelClient {
    /// # Errors
    ///
    /// Returns [`EnrichError::InvalidUrl`] if `base_url` is not absolute, or
    /// [`EnrichError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, EnrichError> {
        let parsed = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            EnrichError::InvalidUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Uses the outbound HTTP timeout and user agent shared with the feed client.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::InvalidUrl`] when `SPORTREND_MODEL_URL` is unset or invalid.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, EnrichError> {
        let url = config
            .model_url
            .as_deref()
            .ok_or_else(|| EnrichError::InvalidUrl {
                url: String::new(),
                reason: "SPORTREND_MODEL_URL is not set".to_string(),
            })?;
        Self::new(url, config.feed_timeout_secs, &config.feed_user_agent)
    }

    fn endpoint(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url
    }

    /// POST `texts` to `endpoint` in batches, expecting one result per input.
    async fn post_batches<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        texts: &[&str],
    ) -> Result<Vec<T>, EnrichError> {
        let url = self.endpoint(endpoint);
        let mut all = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let response = self
                .client
                .post(url.clone())
                .json(&InputsRequest { inputs: chunk })
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(EnrichError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.text().await?;
            let parsed: Vec<T> =
                serde_json::from_str(&body).map_err(|e| EnrichError::Deserialize {
                    context: format!("{endpoint} response"),
                    source: e,
                })?;

            if parsed.len() != chunk.len() {
                return Err(EnrichError::Model(format!(
                    "{endpoint} returned {} results for {} inputs",
                    parsed.len(),
                    chunk.len()
                )));
            }
            all.extend(parsed);
        }

        Ok(all)
    }
}

fn to_annotation(scores: &[LabelScore]) -> Result<SentimentAnnotation, EnrichError> {
    let best = scores
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| EnrichError::Model("empty sentiment result".to_string()))?;
    let label = map_sentiment_label(&best.label)
        .ok_or_else(|| EnrichError::Model(format!("unknown sentiment label {:?}", best.label)))?;
    Ok(SentimentAnnotation::new(label, best.score))
}

#[async_trait]
impl EntityExtractor for ModelClient {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn extract(&self, text: &str) -> Result<Vec<Entity>, EnrichError> {
        let mut results: Vec<Vec<NerSpan>> = self.post_batches("ner", &[text]).await?;
        let spans = results.pop().unwrap_or_default();
        Ok(spans
            .into_iter()
            .filter_map(|span| {
                let entity_type = map_ner_label(&span.entity_group)?;
                let word = canonicalize(span.word.trim());
                if word.is_empty() {
                    return None;
                }
                Some(Entity {
                    text: word,
                    entity_type,
                    span: Span {
                        start: span.start,
                        end: span.end,
                    },
                    confidence: span.score.clamp(0.0, 1.0),
                })
            })
            .collect())
    }
}

#[async_trait]
impl SentimentScorer for ModelClient {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn score(&self, text: &str) -> Result<SentimentAnnotation, EnrichError> {
        let mut results = self.score_batch(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| EnrichError::Model("empty sentiment response".to_string()))
    }

    async fn score_batch(
        &self,
        texts: &[&str],
    ) -> Result<Vec<SentimentAnnotation>, EnrichError> {
        let results: Vec<Vec<LabelScore>> = self.post_batches("sentiment", texts).await?;
        results.iter().map(|scores| to_annotation(scores)).collect()
    }
}
