//! Text cleaning for raw items, and the stage that writes processed items.
//!
//! Cleaning is a pure function of the raw content: the same content always
//! yields byte-identical `clean_text`, `normalized_text` and `tokens`.

use std::sync::LazyLock;
use std::time::Instant;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use sportrend_core::text::{
    canonicalize, collapse_whitespace, is_arabic, is_stop_token, tokenize,
};
use sportrend_core::NewProcessedItem;
use sportrend_db::Repository;

use crate::error::{NormalizeError, StageError};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("valid regex"));

static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Arabic-only text with links, mentions and `#` markers removed.
    pub clean_text: String,
    /// `clean_text` without diacritics and with letter variants unified.
    pub normalized_text: String,
    /// Words of `normalized_text` minus stop words.
    pub tokens: Vec<String>,
}

/// Clean, canonicalize and tokenize one item's content.
///
/// # Errors
///
/// Returns [`NormalizeError::EmptyContent`] when nothing Arabic survives cleaning.
pub fn normalize_content(content: &str) -> Result<NormalizedText, NormalizeError> {
    let without_urls = URL_PATTERN.replace_all(content, " ");
    let without_mentions = MENTION_PATTERN.replace_all(&without_urls, " ");
    let restricted: String = without_mentions
        .chars()
        .map(|c| if is_arabic(c) || c.is_whitespace() { c } else { ' ' })
        .collect();

    let clean_text = collapse_whitespace(&restricted);
    let normalized_text = collapse_whitespace(&canonicalize(&clean_text));
    if normalized_text.is_empty() {
        return Err(NormalizeError::EmptyContent);
    }

    let tokens = tokenize(&normalized_text)
        .into_iter()
        .filter(|t| !is_stop_token(t))
        .collect();

    Ok(NormalizedText {
        clean_text,
        normalized_text,
        tokens,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub scanned: usize,
    pub normalized: usize,
    /// Items whose content cleaned down to nothing; left unprocessed.
    pub empty: usize,
    pub timed_out: bool,
}

/// Normalize every unprocessed raw item, `batch_size` at a time.
///
/// Items whose content is empty after cleaning lose any processed record and
/// keep `is_processed = false`, so a corrected resubmission is picked up again.
/// Raw items are paged by id, so each one is visited at most once per call.
/// Once `deadline` passes no further batch is started.
///
/// # Errors
///
/// Returns [`StageError::Db`] if the repository fails.
pub async fn run_normalize_stage(
    repo: &dyn Repository,
    batch_size: usize,
    deadline: Option<Instant>,
) -> Result<NormalizeReport, StageError> {
    let mut report = NormalizeReport::default();
    let mut after_id = 0;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            report.timed_out = true;
            tracing::warn!(stage = "normalize", scanned = report.scanned, "stage deadline reached");
            break;
        }

        let batch = repo.list_unprocessed_raw(after_id, batch_size).await?;
        let Some(last) = batch.last() else {
            break;
        };
        after_id = last.id;
        let processed_at = Utc::now();

        for raw in batch {
            report.scanned += 1;
            match normalize_content(&raw.content) {
                Ok(normalized) => {
                    repo.upsert_processed(NewProcessedItem {
                        raw_item_id: raw.id,
                        clean_text: normalized.clean_text,
                        normalized_text: normalized.normalized_text,
                        tokens: normalized.tokens,
                        processed_at,
                    })
                    .await?;
                    repo.set_raw_processed(raw.id, true).await?;
                    report.normalized += 1;
                }
                Err(err) => {
                    let removed = repo.delete_processed_for_raw(raw.id).await?;
                    repo.set_raw_processed(raw.id, false).await?;
                    tracing::warn!(
                        stage = "normalize",
                        raw_item_id = raw.id,
                        source = %raw.source,
                        source_id = %raw.source_id,
                        removed_processed = removed,
                        error = %err,
                        "excluding item from enrichment"
                    );
                    report.empty += 1;
                }
            }
        }
    }

    tracing::info!(
        stage = "normalize",
        scanned = report.scanned,
        normalized = report.normalized,
        empty = report.empty,
        "normalize stage finished"
    );
    Ok(report)
}
