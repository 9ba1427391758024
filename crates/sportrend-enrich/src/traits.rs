use async_trait::async_trait;
use sportrend_core::{Entity, SentimentAnnotation};

use crate::error::EnrichError;

/// Finds player, team and competition mentions in a text.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Spans are char offsets into `text`.
    async fn extract(&self, text: &str) -> Result<Vec<Entity>, EnrichError>;
}

/// Classifies the polarity of a text.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, text: &str) -> Result<SentimentAnnotation, EnrichError>;

    /// Score several texts, one result per input in input order.
    ///
    /// The default scores each text on its own; implementations with a
    /// batched backend override it.
    async fn score_batch(
        &self,
        texts: &[&str],
    ) -> Result<Vec<SentimentAnnotation>, EnrichError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.score(text).await?);
        }
        Ok(out)
    }
}
