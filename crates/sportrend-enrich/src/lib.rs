//! Entity extraction and sentiment scoring backends for the enrichment stages.
//!
//! The pipeline only sees [`EntityExtractor`] and [`SentimentScorer`]. Two
//! backends implement them: a rule-based lexicon for Arabic sports text and an
//! HTTP client for a transformer model server.

pub mod error;
pub mod lexicon;
pub mod model;
pub mod services;
pub mod traits;

mod gazetteer;

pub use error::EnrichError;
pub use lexicon::{polarity, LexiconEntityExtractor, LexiconSentimentScorer};
pub use model::{map_ner_label, map_sentiment_label, ModelClient};
pub use services::EnrichmentServices;
pub use traits::{EntityExtractor, SentimentScorer};
