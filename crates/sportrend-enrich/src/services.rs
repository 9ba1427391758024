use std::sync::Arc;

use sportrend_core::AppConfig;

use crate::error::EnrichError;
use crate::lexicon::{LexiconEntityExtractor, LexiconSentimentScorer};
use crate::model::ModelClient;
use crate::traits::{EntityExtractor, SentimentScorer};

/// Process-wide enrichment backends.
///
/// Built once at startup and cloned into every pipeline run; the pipeline
/// never loads or unloads a model itself.
#[derive(Clone)]
pub struct EnrichmentServices {
    entities: Arc<dyn EntityExtractor>,
    sentiment: Arc<dyn SentimentScorer>,
}

impl std::fmt::Debug for EnrichmentServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentServices")
            .field("entities", &self.entities.name())
            .field("sentiment", &self.sentiment.name())
            .finish()
    }
}

impl EnrichmentServices {
    #[must_use]
    pub fn new(entities: Arc<dyn EntityExtractor>, sentiment: Arc<dyn SentimentScorer>) -> Self {
        Self {
            entities,
            sentiment,
        }
    }

    /// Rule-based backends; no network access.
    #[must_use]
    pub fn lexicon() -> Self {
        Self::new(
            Arc::new(LexiconEntityExtractor::new()),
            Arc::new(LexiconSentimentScorer::new()),
        )
    }

    /// Model server when `SPORTREND_MODEL_URL` is set, lexicon otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the model client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, EnrichError> {
        let services = if config.model_url.is_some() {
            let client = Arc::new(ModelClient::from_app_config(config)?);
            Self::new(client.clone(), client)
        } else {
            Self::lexicon()
        };
        tracing::info!(
            entities = services.entities.name(),
            sentiment = services.sentiment.name(),
            "enrichment services initialized"
        );
        Ok(services)
    }

    #[must_use]
    pub fn entities(&self) -> &Arc<dyn EntityExtractor> {
        &self.entities
    }

    #[must_use]
    pub fn sentiment(&self) -> &Arc<dyn SentimentScorer> {
        &self.sentiment
    }

    /// Release this handle. Backends are dropped once the last clone is released.
    pub fn shutdown(self) {
        let remaining = Arc::strong_count(&self.entities).saturating_sub(1);
        tracing::info!(
            entities = self.entities.name(),
            sentiment = self.sentiment.name(),
            remaining_handles = remaining,
            "enrichment services released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lexicon_services_enrich_without_network() {
        let services = EnrichmentServices::lexicon();
        let entities = services
            .entities()
            .extract("مبروك للنصر")
            .await
            .expect("lexicon extraction never fails");
        assert!(entities.is_empty());
        let sentiment = services
            .sentiment()
            .score("مبروك")
            .await
            .expect("lexicon scoring never fails");
        assert_eq!(sentiment.label, sportrend_core::SentimentLabel::Positive);
        assert_eq!(format!("{services:?}"), "EnrichmentServices { entities: \"lexicon\", sentiment: \"lexicon\" }");
        services.shutdown();
    }
}
