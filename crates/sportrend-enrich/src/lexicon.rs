//! Rule-based enrichment: gazetteer entity matching and a polarity lexicon.

use std::collections::HashSet;

use async_trait::async_trait;
use sportrend_core::text::{canonicalize, is_diacritic, is_stop_token};
use sportrend_core::{Entity, EntityType, SentimentAnnotation, SentimentLabel, Span};

use crate::error::EnrichError;
use crate::gazetteer::{context_word, Alias, ALIASES};
use crate::traits::{EntityExtractor, SentimentScorer};

const GAZETTEER_CONFIDENCE: f64 = 0.95;
const CONTEXT_CONFIDENCE: f64 = 0.6;

/// One word of the input with its char offsets and canonical spelling.
#[derive(Debug)]
struct Word {
    start: usize,
    end: usize,
    canonical: String,
}

/// Words are runs of alphanumerics; diacritics stay inside the word they mark.
fn words(text: &str) -> Vec<Word> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    for (idx, c) in text.chars().enumerate() {
        if c.is_alphanumeric() || (is_diacritic(c) && !current.is_empty()) {
            if current.is_empty() {
                start = idx;
            }
            current.push(c);
        } else if !current.is_empty() {
            out.push(Word {
                start,
                end: idx,
                canonical: canonicalize(&current),
            });
            current.clear();
        }
    }
    if !current.is_empty() {
        out.push(Word {
            start,
            end: text.chars().count(),
            canonical: canonicalize(&current),
        });
    }
    out
}

fn match_alias(words: &[Word]) -> Option<&'static Alias> {
    ALIASES.iter().find(|alias| {
        alias.tokens.len() <= words.len()
            && alias
                .tokens
                .iter()
                .zip(words)
                .all(|(token, word)| *token == word.canonical)
    })
}

fn is_name_candidate(word: &Word) -> bool {
    word.canonical.chars().count() >= 2
        && !is_stop_token(&word.canonical)
        && context_word(&word.canonical).is_none()
        && !word.canonical.chars().all(char::is_numeric)
}

/// Gazetteer matching plus context-word rules over Arabic text.
///
/// Known names win over context rules and longer names over shorter ones.
/// Each `(type, text)` pair is reported once per text, at its first mention.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconEntityExtractor;

impl LexiconEntityExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn extract_sync(&self, text: &str) -> Vec<Entity> {
        let words = words(text);
        let mut entities = Vec::new();
        let mut seen: HashSet<(EntityType, String)> = HashSet::new();
        let mut push = |entity: Entity| {
            if seen.insert((entity.entity_type, entity.text.clone())) {
                entities.push(entity);
            }
        };

        let mut i = 0;
        while i < words.len() {
            if let Some(alias) = match_alias(&words[i..]) {
                let last = &words[i + alias.tokens.len() - 1];
                push(Entity {
                    text: alias.name.clone(),
                    entity_type: alias.entity_type,
                    span: Span {
                        start: words[i].start,
                        end: last.end,
                    },
                    confidence: GAZETTEER_CONFIDENCE,
                });
                i += alias.tokens.len();
                continue;
            }

            if let (Some(ctx), Some(next)) = (context_word(&words[i].canonical), words.get(i + 1)) {
                if is_name_candidate(next) && match_alias(&words[i + 1..]).is_none() {
                    let (text, start) = if ctx.include_prefix {
                        (format!("{} {}", ctx.token, next.canonical), words[i].start)
                    } else {
                        (next.canonical.clone(), next.start)
                    };
                    push(Entity {
                        text,
                        entity_type: ctx.entity_type,
                        span: Span {
                            start,
                            end: next.end,
                        },
                        confidence: CONTEXT_CONFIDENCE,
                    });
                    i += 2;
                    continue;
                }
            }
            i += 1;
        }
        entities
    }
}

#[async_trait]
impl EntityExtractor for LexiconEntityExtractor {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    async fn extract(&self, text: &str) -> Result<Vec<Entity>, EnrichError> {
        Ok(self.extract_sync(text))
    }
}

/// Polarity weights for common sports vocabulary, in canonical spelling.
///
/// Values in `(0.0, 1.0]` are positive, `[-1.0, 0.0)` negative.
const POLARITY: &[(&str, f64)] = &[
    // Positive
    ("فوز", 0.5),
    ("يفوز", 0.5),
    ("فاز", 0.5),
    ("انتصار", 0.5),
    ("بطل", 0.4),
    ("رائع", 0.5),
    ("رائعه", 0.5),
    ("مبروك", 0.6),
    ("ممتاز", 0.5),
    ("جميل", 0.4),
    ("افضل", 0.4),
    ("عظيم", 0.5),
    ("اسطوري", 0.6),
    ("تالق", 0.4),
    ("متالق", 0.4),
    ("هدف", 0.2),
    ("احسنت", 0.5),
    ("فخر", 0.5),
    ("تتويج", 0.5),
    ("يستحق", 0.3),
    // Negative
    ("خساره", -0.5),
    ("خسر", -0.5),
    ("هزيمه", -0.6),
    ("سيء", -0.5),
    ("سيئ", -0.5),
    ("فاشل", -0.6),
    ("فشل", -0.5),
    ("ضعيف", -0.4),
    ("مخيب", -0.5),
    ("ظلم", -0.5),
    ("اصابه", -0.3),
    ("فضيحه", -0.7),
    ("كارثه", -0.7),
    ("اقاله", -0.4),
    ("غضب", -0.4),
    ("حزين", -0.4),
];

/// Negators flip the weight of the word that follows them.
const NEGATORS: &[&str] = &["لا", "ليس", "غير", "لم", "لن", "ما"];

/// Scores with magnitude at or below this are neutral.
const NEUTRAL_BAND: f64 = 0.1;

/// Sum of polarity weights in `[-1.0, 1.0]`; `0.0` for empty or unknown text.
#[must_use]
pub fn polarity(text: &str) -> f64 {
    let mut score = 0.0_f64;
    let mut negate = false;
    for word in words(text) {
        if NEGATORS.contains(&word.canonical.as_str()) {
            negate = true;
            continue;
        }
        if let Some(&(_, weight)) = POLARITY.iter().find(|(w, _)| *w == word.canonical) {
            score += if negate { -weight } else { weight };
        }
        negate = false;
    }
    score.clamp(-1.0, 1.0)
}

/// Lexicon sentiment: label from the sign of [`polarity`], confidence from its size.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconSentimentScorer;

impl LexiconSentimentScorer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn score_sync(&self, text: &str) -> SentimentAnnotation {
        let score = polarity(text);
        if score > NEUTRAL_BAND {
            SentimentAnnotation::new(SentimentLabel::Positive, 0.5 + score / 2.0)
        } else if score < -NEUTRAL_BAND {
            SentimentAnnotation::new(SentimentLabel::Negative, 0.5 - score / 2.0)
        } else {
            SentimentAnnotation::new(SentimentLabel::Neutral, 1.0 - score.abs())
        }
    }
}

#[async_trait]
impl SentimentScorer for LexiconSentimentScorer {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    async fn score(&self, text: &str) -> Result<SentimentAnnotation, EnrichError> {
        Ok(self.score_sync(text))
    }
}

#[cfg(test)]
#[path = "lexicon_test.rs"]
mod tests;
