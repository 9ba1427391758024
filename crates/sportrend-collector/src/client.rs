use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use sportrend_core::AppConfig;

use crate::error::FeedError;
use crate::source::{CandidateItem, FeedPage, FeedQuery, FeedSource};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// HTTP client for a JSON search feed.
///
/// `GET {base}/search?q=..&limit=..&cursor=..` answers
/// `{"items": [...], "next_cursor": "..."}`. Items are decoded one at a time
/// so a malformed entry never fails the page.
///
/// The client does not retry. HTTP 429 surfaces as
/// [`FeedError::RateLimited`] for the collector's backoff policy.
pub struct HttpFeedClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    name: String,
}

impl HttpFeedClient {
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] if `base_url` is not an absolute
    /// URL, or [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, FeedError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            FeedError::InvalidUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        let name = base_url
            .host_str()
            .ok_or_else(|| FeedError::InvalidUrl {
                url: base_url.to_string(),
                reason: "URL has no host".to_string(),
            })?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            name,
        })
    }

    /// Build from `FEED_URL`, `FEED_API_KEY`, and the feed timeout settings.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] when `FEED_URL` is unset or invalid.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, FeedError> {
        let url = config
            .feed_url
            .as_deref()
            .ok_or_else(|| FeedError::InvalidUrl {
                url: String::new(),
                reason: "FEED_URL is not set".to_string(),
            })?;
        Self::new(
            url,
            config.feed_api_key.clone(),
            config.feed_timeout_secs,
            &config.feed_user_agent,
        )
    }

    fn search_url(&self, query: &FeedQuery, cursor: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("search");
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &query.query)
                .append_pair("limit", &query.page_size.to_string());
            if let Some(cursor) = cursor {
                pairs.append_pair("cursor", cursor);
            }
        }
        url
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        let url = self.search_url(query, cursor);
        let mut request = self.client.get(url.clone());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(FeedError::RateLimited { retry_after_secs });
        }

        if status.is_server_error() {
            return Err(FeedError::Transient(format!("HTTP {status} from {url}")));
        }

        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<SearchResponse>(&body).map_err(|e| {
            FeedError::Deserialize {
                context: format!("search page for {:?}", query.query),
                source: e,
            }
        })?;

        let items = parsed
            .items
            .into_iter()
            .map(|value| {
                serde_json::from_value::<CandidateItem>(value)
                    .map_err(|e| FeedError::MalformedItem(e.to_string()))
            })
            .collect();

        Ok(FeedPage {
            items,
            next_cursor: parsed.next_cursor.filter(|c| !c.is_empty()),
        })
    }
}
