//! Feed collection: pulls search results into the raw-item store.

pub mod backoff;
pub mod client;
pub mod collector;
pub mod error;
pub mod filter;
pub mod source;

pub use backoff::BackoffPolicy;
pub use client::HttpFeedClient;
pub use collector::{CollectReport, CollectSummary, Collector};
pub use error::{CollectError, FeedError};
pub use filter::{is_spam, Screened};
pub use source::{CandidateItem, FeedPage, FeedQuery, FeedSource};
