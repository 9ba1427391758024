//! Turns feed candidates into keyed raw items, dropping spam and low-engagement items.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use sha2::{Digest, Sha256};
use sportrend_core::{text, NewRawItem};

use crate::source::{CandidateItem, FeedQuery};

/// Link-only posts, bare numbers, and anything ten characters or shorter.
static SPAM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:(?:http|www).*|\d{5,}|.{0,10})$").expect("valid regex")
});

const DEFAULT_LANGUAGE: &str = "ar";
const DEFAULT_PARENT: &str = "feed";

#[derive(Debug, Clone, PartialEq)]
pub enum Screened {
    Accepted(NewRawItem),
    Spam,
    BelowMinLikes { likes: i64 },
}

#[must_use]
pub fn is_spam(text: &str) -> bool {
    SPAM_PATTERN.is_match(text.trim())
}

/// Stable id for items the feed did not id: `<parent>_<first 16 hex of sha256(content)>`.
#[must_use]
pub fn fallback_source_id(parent_id: Option<&str>, content: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(content.as_bytes()));
    let parent = parent_id
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PARENT);
    format!("{parent}_{}", &digest[..16])
}

/// Apply the collection rules to one candidate.
#[must_use]
pub fn screen(candidate: CandidateItem, query: &FeedQuery, source: &str) -> Screened {
    let content = candidate.text.trim().to_string();
    if is_spam(&content) {
        return Screened::Spam;
    }
    if candidate.likes < query.min_likes {
        return Screened::BelowMinLikes {
            likes: candidate.likes,
        };
    }

    let source_id = match candidate.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => fallback_source_id(candidate.parent_id.as_deref(), &content),
    };

    Screened::Accepted(NewRawItem {
        source: source.to_string(),
        source_id,
        hashtags: text::extract_hashtags(&content),
        content,
        author_id: candidate.author_id,
        author_name: candidate.author_name,
        author_followers: candidate.author_followers,
        author_verified: candidate.author_verified,
        likes: candidate.likes,
        shares: candidate.shares,
        comments: candidate.comments,
        language: candidate
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        sport_type: Some(query.sport_type.clone()),
        created_at: candidate.created_at.unwrap_or_else(Utc::now),
    })
}
