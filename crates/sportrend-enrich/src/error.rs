use thiserror::Error;

/// A failed enrichment call. The stage runner turns it into an error marker.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model server returned status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model error: {0}")]
    Model(String),

    #[error("invalid model URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
