//! Accumulators filled while scanning the window.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use sportrend_core::{DayBucket, SampleItem, SentimentAnnotation, SentimentLabel, SentimentTally};

/// Sample items kept per highlight.
pub const MAX_SAMPLES: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct TallyBuilder {
    tally: SentimentTally,
    score_sum: f64,
}

impl TallyBuilder {
    pub fn add(&mut self, sentiment: Option<&SentimentAnnotation>) {
        let Some(sentiment) = sentiment else {
            return;
        };
        match sentiment.label {
            SentimentLabel::Positive => self.tally.positive += 1,
            SentimentLabel::Neutral => self.tally.neutral += 1,
            SentimentLabel::Negative => self.tally.negative += 1,
            SentimentLabel::Error => {
                self.tally.error += 1;
                return;
            }
        }
        self.score_sum += sentiment.score;
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(&self) -> SentimentTally {
        let scored = self.tally.scored();
        SentimentTally {
            average_score: if scored == 0 {
                0.0
            } else {
                self.score_sum / scored as f64
            },
            ..self.tally.clone()
        }
    }
}

/// Newest-first sample list capped at [`MAX_SAMPLES`].
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    items: Vec<SampleItem>,
}

impl SampleSet {
    pub fn offer(&mut self, sample: &SampleItem) {
        if self.items.len() == MAX_SAMPLES
            && self
                .items
                .last()
                .is_some_and(|oldest| sample_key(sample) <= sample_key(oldest))
        {
            return;
        }
        self.items.push(sample.clone());
        self.items.sort_by(|a, b| sample_key(b).cmp(&sample_key(a)));
        self.items.truncate(MAX_SAMPLES);
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<SampleItem> {
        self.items
    }
}

fn sample_key(sample: &SampleItem) -> (chrono::DateTime<chrono::Utc>, i64) {
    (sample.date, sample.processed_item_id)
}

/// Mentions per calendar day across a fixed, inclusive date range.
#[derive(Debug, Clone, Default)]
pub struct DayHistogram {
    counts: BTreeMap<NaiveDate, u64>,
}

impl DayHistogram {
    pub fn add(&mut self, date: NaiveDate) {
        *self.counts.entry(date).or_default() += 1;
    }

    /// One bucket per day from `first` to `last` inclusive, zero-filled.
    /// Dates outside the range are dropped.
    #[must_use]
    pub fn buckets(&self, first: NaiveDate, last: NaiveDate) -> Vec<DayBucket> {
        let mut out = Vec::new();
        let mut date = first;
        while date <= last {
            out.push(DayBucket {
                date,
                mentions: self.counts.get(&date).copied().unwrap_or(0),
            });
            match date.checked_add_days(Days::new(1)) {
                Some(next) => date = next,
                None => break,
            }
        }
        out
    }
}

/// Majority vote with ties broken by the smaller key.
#[must_use]
pub fn majority<K: Ord + Clone>(votes: &HashMap<K, u64>) -> Option<K> {
    votes
        .iter()
        .max_by(|(ka, va), (kb, vb)| va.cmp(vb).then_with(|| kb.cmp(ka)))
        .map(|(k, _)| k.clone())
}

/// Accumulated figures for one ranking key.
#[derive(Debug, Clone, Default)]
pub struct KeyStats {
    pub count: u64,
    pub sentiment: TallyBuilder,
    pub daily: DayHistogram,
    pub samples: SampleSet,
}

impl KeyStats {
    pub fn record(
        &mut self,
        day: NaiveDate,
        sentiment: Option<&SentimentAnnotation>,
        sample: &SampleItem,
    ) {
        self.count += 1;
        self.sentiment.add(sentiment);
        self.daily.add(day);
        self.samples.offer(sample);
    }
}
