//! Windowed trend aggregation.
//!
//! One call scans the enriched items of the trailing window (and, for growth,
//! the window before it), builds a complete [`Snapshot`], upserts a topic and a
//! trend per global entry, and inserts the snapshot as a new record. Earlier
//! snapshots are never modified.

mod metrics;
mod stats;

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use sportrend_core::text::{is_stop_token, literal_hashtags, tokenize};
use sportrend_core::{
    DashboardSummary, DayBucket, EnrichedItem, Entity, EntityHighlight, EntityRef, EntityType,
    EntityTypeDetail, HashtagCount, NewTopic, NewTrend, SampleItem, SentimentLabel, Snapshot,
    SnapshotRecord, SportBreakdown, TopEntity, TrendEntry, TrendMetrics, WordCount,
    MAX_WINDOW_DAYS, UNKNOWN_SPORT,
};
use sportrend_db::{DbError, EnrichedFilter, Repository};

use crate::error::AggregateError;

pub use metrics::{classify, growth_rate};
use stats::{majority, DayHistogram, KeyStats, SampleSet, TallyBuilder};

/// Entries kept in the global trend list.
pub const GLOBAL_TREND_LIMIT: usize = 10;
/// Entries kept in the dashboard word list.
pub const WORD_LIMIT: usize = 50;
/// Shorter tokens are left out of word counts.
const MIN_WORD_CHARS: usize = 3;
/// Co-mentioned entities stored on a topic.
const RELATED_ENTITY_LIMIT: usize = 5;
const DEFAULT_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateParams {
    pub window_days: u32,
    pub entity_types: Vec<EntityType>,
    /// End of the window.
    pub now: DateTime<Utc>,
    /// Items read per repository call.
    pub page_size: usize,
}

impl AggregateParams {
    #[must_use]
    pub fn new(window_days: u32, entity_types: Vec<EntityType>) -> Self {
        Self {
            window_days,
            entity_types,
            now: Utc::now(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// `(previous window start, window start)`, or `None` when the window
    /// length is out of range or reaches past the calendar.
    fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return None;
        }
        let window = TimeDelta::days(i64::from(self.window_days));
        let start = self.now.checked_sub_signed(window)?;
        let previous = start.checked_sub_signed(window)?;
        Some((previous, start))
    }
}

type Key = (EntityType, String);

/// In-scope entities of an item, one per `(type, text)`.
fn scoped_entities<'a>(item: &'a EnrichedItem, scope: &[EntityType]) -> Vec<&'a Entity> {
    let mut seen = HashSet::new();
    item.processed
        .entities
        .iter()
        .filter(|e| scope.contains(&e.entity_type))
        .filter(|e| seen.insert((e.entity_type, e.text.as_str())))
        .collect()
}

fn sample_of(item: &EnrichedItem) -> SampleItem {
    let sentiment = item.processed.sentiment;
    SampleItem {
        processed_item_id: item.processed.id,
        text: item.raw.content.clone(),
        author_name: item.raw.author_name.clone(),
        sentiment: sentiment.map_or(SentimentLabel::Error, |s| s.label),
        sentiment_score: sentiment.map_or(0.0, |s| s.score),
        date: item.raw.created_at,
        sport_type: item.raw.sport_type_or_unknown().to_string(),
    }
}

/// Call `visit` for every item matching `filter`, one page at a time.
///
/// Only an empty page ends the scan; a short page can still be followed by
/// more rows when the store drops orphans after applying its limit.
async fn scan<F>(repo: &dyn Repository, filter: EnrichedFilter, mut visit: F) -> Result<(), DbError>
where
    F: FnMut(&EnrichedItem) + Send,
{
    let mut filter = filter;
    loop {
        let page = repo.list_enriched(&filter).await?;
        let Some(last) = page.last().map(|item| item.processed.id) else {
            return Ok(());
        };
        for item in &page {
            visit(item);
        }
        filter = filter.after(last);
    }
}

#[derive(Default)]
struct WindowStats {
    items: u64,
    keys: HashMap<Key, KeyStats>,
    sports: HashMap<Key, HashMap<String, u64>>,
    co_mentions: HashMap<Key, HashMap<Key, u64>>,
    /// `(sport, type, text)` figures for the per-sport breakdown.
    per_sport: HashMap<(String, EntityType, String), KeyStats>,
    sport_items: HashMap<String, u64>,
    /// Mention-level figures per entity type.
    per_type: HashMap<EntityType, KeyStats>,
}

impl WindowStats {
    fn record(&mut self, item: &EnrichedItem, scope: &[EntityType]) {
        let entities = scoped_entities(item, scope);
        if entities.is_empty() {
            return;
        }
        self.items += 1;

        let day = item.processed.processed_at.date_naive();
        let sentiment = item.processed.sentiment.as_ref();
        let sample = sample_of(item);
        let sport = sample.sport_type.clone();
        *self.sport_items.entry(sport.clone()).or_default() += 1;

        let keys: Vec<Key> = entities
            .iter()
            .map(|e| (e.entity_type, e.text.clone()))
            .collect();

        for key in &keys {
            self.keys
                .entry(key.clone())
                .or_default()
                .record(day, sentiment, &sample);
            *self
                .sports
                .entry(key.clone())
                .or_default()
                .entry(sport.clone())
                .or_default() += 1;
            self.per_sport
                .entry((sport.clone(), key.0, key.1.clone()))
                .or_default()
                .record(day, sentiment, &sample);
            self.per_type
                .entry(key.0)
                .or_default()
                .record(day, sentiment, &sample);
            let related = self.co_mentions.entry(key.clone()).or_default();
            for other in keys.iter().filter(|other| *other != key) {
                *related.entry(other.clone()).or_default() += 1;
            }
        }
    }

    /// Keys by count descending, then type, then text.
    fn ranked(&self) -> Vec<(&Key, &KeyStats)> {
        let mut ranked: Vec<_> = self.keys.iter().collect();
        ranked.sort_by(|(ka, sa), (kb, sb)| sb.count.cmp(&sa.count).then_with(|| ka.cmp(kb)));
        ranked
    }
}

/// Whole-corpus figures for the dashboard summary.
#[derive(Default)]
struct CorpusStats {
    total_items: u64,
    hashtags: HashMap<String, u64>,
    words: HashMap<String, u64>,
    sentiment: TallyBuilder,
}

impl CorpusStats {
    fn record(&mut self, item: &EnrichedItem) {
        self.total_items += 1;
        for tag in literal_hashtags(&item.raw.content) {
            *self.hashtags.entry(tag).or_default() += 1;
        }
        for token in &item.processed.tokens {
            if token.chars().count() >= MIN_WORD_CHARS && !is_stop_token(token) {
                *self.words.entry(token.clone()).or_default() += 1;
            }
        }
        if item.processed.is_analyzed_for_sentiment {
            self.sentiment.add(item.processed.sentiment.as_ref());
        }
    }

    fn top_hashtag(&self) -> Option<HashtagCount> {
        self.hashtags
            .iter()
            .max_by(|(ta, ca), (tb, cb)| ca.cmp(cb).then_with(|| tb.cmp(ta)))
            .map(|(tag, count)| HashtagCount {
                tag: tag.clone(),
                count: *count,
            })
    }

    fn top_words(&self) -> Vec<WordCount> {
        let mut words: Vec<WordCount> = self
            .words
            .iter()
            .map(|(word, count)| WordCount {
                word: word.clone(),
                count: *count,
            })
            .collect();
        words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        words.truncate(WORD_LIMIT);
        words
    }
}

fn top_entity(key: &Key, stats: &KeyStats) -> TopEntity {
    TopEntity {
        text: key.1.clone(),
        entity_type: key.0,
        count: stats.count,
    }
}

struct Builder<'a> {
    params: &'a AggregateParams,
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl Builder<'_> {
    fn days(&self, histogram: &DayHistogram) -> Vec<DayBucket> {
        histogram.buckets(self.first_day, self.last_day)
    }

    fn global_trends(
        &self,
        window: &WindowStats,
        previous: &HashMap<Key, u64>,
    ) -> Vec<TrendEntry> {
        window
            .ranked()
            .into_iter()
            .take(GLOBAL_TREND_LIMIT)
            .map(|(key, stats)| {
                let previous_count = previous.get(key).copied().unwrap_or(0);
                let growth = growth_rate(stats.count, previous_count);
                TrendEntry {
                    entity_text: key.1.clone(),
                    entity_type: key.0,
                    count: stats.count,
                    previous_count,
                    growth_rate: growth,
                    status: classify(stats.count, growth),
                    sentiment: stats.sentiment.finish(),
                    dominant_sport: window
                        .sports
                        .get(key)
                        .and_then(majority)
                        .unwrap_or_else(|| UNKNOWN_SPORT.to_string()),
                    daily_mentions: self.days(&stats.daily),
                }
            })
            .collect()
    }

    fn sport_breakdown(&self, window: &WindowStats) -> BTreeMap<String, SportBreakdown> {
        let mut best: HashMap<(&str, EntityType), (&str, &KeyStats)> = HashMap::new();
        for ((sport, entity_type, text), stats) in &window.per_sport {
            let slot = best
                .entry((sport.as_str(), *entity_type))
                .or_insert((text.as_str(), stats));
            let tie = stats.count == slot.1.count && text.as_str() < slot.0;
            if stats.count > slot.1.count || tie {
                *slot = (text.as_str(), stats);
            }
        }

        let mut breakdown: BTreeMap<String, SportBreakdown> = window
            .sport_items
            .iter()
            .map(|(sport, total)| {
                (
                    sport.clone(),
                    SportBreakdown {
                        sport_type: sport.clone(),
                        total_items: *total,
                        top_entities: BTreeMap::new(),
                    },
                )
            })
            .collect();

        for ((sport, entity_type), (text, stats)) in best {
            if let Some(entry) = breakdown.get_mut(sport) {
                entry.top_entities.insert(
                    entity_type,
                    EntityHighlight {
                        text: text.to_string(),
                        entity_type,
                        count: stats.count,
                        sentiment: stats.sentiment.finish(),
                        daily_mentions: self.days(&stats.daily),
                        samples: stats.samples.clone().into_vec(),
                    },
                );
            }
        }
        breakdown
    }

    fn entity_details(&self, window: &WindowStats) -> BTreeMap<EntityType, EntityTypeDetail> {
        let ranked = window.ranked();
        self.params
            .entity_types
            .iter()
            .map(|&entity_type| {
                let top = ranked.iter().find(|(key, _)| key.0 == entity_type);
                let per_type = window.per_type.get(&entity_type);
                let daily = per_type.map(|s| s.daily.clone()).unwrap_or_default();
                let detail = EntityTypeDetail {
                    entity_type,
                    total_mentions: per_type.map_or(0, |s| s.count),
                    sentiment: per_type.map(|s| s.sentiment.finish()).unwrap_or_default(),
                    top_entity: top.map(|(key, stats)| top_entity(key, stats)),
                    daily_mentions: self.days(&daily),
                    samples: top
                        .map(|(_, stats)| stats.samples.clone().into_vec())
                        .unwrap_or_default(),
                };
                (entity_type, detail)
            })
            .collect()
    }

    fn dashboard(&self, window: &WindowStats, corpus: &CorpusStats) -> DashboardSummary {
        let ranked = window.ranked();
        let top_entities = self
            .params
            .entity_types
            .iter()
            .filter_map(|&entity_type| {
                ranked
                    .iter()
                    .find(|(key, _)| key.0 == entity_type)
                    .map(|(key, stats)| (entity_type, top_entity(key, stats)))
            })
            .collect();
        DashboardSummary {
            total_items: corpus.total_items,
            top_hashtag: corpus.top_hashtag(),
            top_entities,
            overall_sentiment: corpus.sentiment.finish(),
            word_frequencies: corpus.top_words(),
        }
    }
}

fn related_entities(window: &WindowStats, key: &Key) -> Vec<EntityRef> {
    let Some(related) = window.co_mentions.get(key) else {
        return Vec::new();
    };
    let mut ranked: Vec<(&Key, &u64)> = related.iter().collect();
    ranked.sort_by(|(ka, ca), (kb, cb)| cb.cmp(ca).then_with(|| ka.cmp(kb)));
    ranked
        .into_iter()
        .take(RELATED_ENTITY_LIMIT)
        .map(|(key, _)| EntityRef {
            text: key.1.clone(),
            entity_type: key.0,
        })
        .collect()
}

/// Build and store a snapshot of the window ending at `params.now`.
///
/// Returns `None`, writing nothing, when no item in the window qualifies.
///
/// # Errors
///
/// Returns [`AggregateError::InvalidWindow`] when `window_days` is 0 or above
/// [`MAX_WINDOW_DAYS`], and [`AggregateError::Db`] if a repository read or
/// write fails. Topic and trend upserts made before the failure are kept; no
/// snapshot is written.
pub async fn aggregate(
    repo: &dyn Repository,
    params: &AggregateParams,
) -> Result<Option<SnapshotRecord>, AggregateError> {
    let (previous_start, window_start) = params
        .bounds()
        .ok_or(AggregateError::InvalidWindow(params.window_days))?;
    let scope = params.entity_types.as_slice();

    let mut window = WindowStats::default();
    // Inclusive of `now`; storage keeps microsecond precision.
    let window_end = params.now + TimeDelta::microseconds(1);
    let current = EnrichedFilter::fully_enriched(window_start, window_end, params.page_size);
    scan(repo, current, |item| window.record(item, scope)).await?;

    if window.items == 0 {
        tracing::info!(
            window_days = params.window_days,
            "no enriched items in window, snapshot skipped"
        );
        return Ok(None);
    }

    let mut previous: HashMap<Key, u64> = HashMap::new();
    let earlier = EnrichedFilter::fully_enriched(previous_start, window_start, params.page_size);
    scan(repo, earlier, |item| {
        for entity in scoped_entities(item, scope) {
            *previous
                .entry((entity.entity_type, entity.text.clone()))
                .or_default() += 1;
        }
    })
    .await?;

    let mut corpus = CorpusStats::default();
    scan(repo, EnrichedFilter::all_valid(params.page_size), |item| {
        corpus.record(item);
    })
    .await?;

    let builder = Builder {
        params,
        first_day: window_start.date_naive(),
        last_day: params.now.date_naive(),
    };
    let snapshot = Snapshot {
        analysis_time: params.now,
        window_days: params.window_days,
        entity_types: params.entity_types.clone(),
        global_trends: builder.global_trends(&window, &previous),
        sport_breakdown: builder.sport_breakdown(&window),
        dashboard: builder.dashboard(&window, &corpus),
        entity_details: builder.entity_details(&window),
    };

    // Topics are keyed by text alone; the highest-ranked entry per text wins.
    let mut topics_written = HashSet::new();
    for entry in &snapshot.global_trends {
        if !topics_written.insert(entry.entity_text.as_str()) {
            tracing::debug!(
                topic = %entry.entity_text,
                entity_type = %entry.entity_type,
                "topic already written by a higher-ranked entry"
            );
            continue;
        }
        let key = (entry.entity_type, entry.entity_text.clone());
        repo.upsert_topic(NewTopic {
            name: entry.entity_text.clone(),
            keywords: tokenize(&entry.entity_text),
            related_entities: related_entities(&window, &key),
        })
        .await?;
        repo.upsert_trend(NewTrend {
            topic_name: entry.entity_text.clone(),
            metrics: TrendMetrics {
                comment_count: entry.count,
                growth_rate: entry.growth_rate,
            },
            sentiment_distribution: entry.sentiment.clone(),
            status: entry.status,
        })
        .await?;
    }

    let id = repo.insert_snapshot(&snapshot).await?;
    tracing::info!(
        snapshot_id = id,
        window_days = params.window_days,
        items = window.items,
        trends = snapshot.global_trends.len(),
        sports = snapshot.sport_breakdown.len(),
        "snapshot written"
    );
    Ok(Some(SnapshotRecord { id, snapshot }))
}
