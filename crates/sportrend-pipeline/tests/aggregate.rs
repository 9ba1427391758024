//! Trend aggregation over seeded enriched items.

mod common;

use chrono::{DateTime, TimeDelta, Utc};
use common::{entity, seed_enriched, seed_processed, Fault, FaultyRepository};
use sportrend_core::{
    EntityType, SentimentAnnotation, SentimentLabel, TrendStatus, MAX_WINDOW_DAYS,
};
use sportrend_db::MemoryRepository;
use sportrend_pipeline::{aggregate, AggregateError, AggregateParams};

const ALL_TYPES: [EntityType; 3] = [EntityType::Player, EntityType::Team, EntityType::Competition];

fn positive() -> SentimentAnnotation {
    SentimentAnnotation::new(SentimentLabel::Positive, 0.8)
}

#[tokio::test]
async fn sixty_mentions_after_ten_is_an_emerging_trend() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    for i in 0..60 {
        seed_enriched(
            &repo,
            &format!("cur{i}"),
            "محمد صلاح يسجل هدفا",
            "football",
            now - TimeDelta::hours(1),
            vec![entity("محمد صلاح", EntityType::Player)],
            positive(),
        )
        .await;
    }
    for i in 0..10 {
        seed_enriched(
            &repo,
            &format!("prev{i}"),
            "محمد صلاح يسجل هدفا",
            "football",
            now - TimeDelta::days(10),
            vec![entity("محمد صلاح", EntityType::Player)],
            positive(),
        )
        .await;
    }

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    let record = aggregate(&repo, &params).await.unwrap().expect("snapshot");

    let trend = &record.snapshot.global_trends[0];
    assert_eq!(trend.entity_text, "محمد صلاح");
    assert_eq!(trend.count, 60);
    assert_eq!(trend.previous_count, 10);
    assert!((trend.growth_rate - 454.545).abs() < 0.01);
    assert_eq!(trend.status, TrendStatus::Emerging);
    assert_eq!(trend.dominant_sport, "football");
    assert_eq!(trend.daily_mentions.len(), 8);
    assert_eq!(trend.daily_mentions.iter().map(|d| d.mentions).sum::<u64>(), 60);
    assert_eq!(trend.sentiment.positive, 60);

    assert_eq!(record.snapshot.dashboard.total_items, 70);
    assert_eq!(record.snapshot.dashboard.overall_sentiment.positive, 70);

    let stored = repo.trends();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].topic_name, "محمد صلاح");
    assert_eq!(stored[0].status, TrendStatus::Emerging);
    assert_eq!(repo.snapshots().len(), 1);
}

#[tokio::test]
async fn empty_window_writes_no_snapshot() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    seed_enriched(
        &repo,
        "old",
        "الهلال يفوز",
        "football",
        now - TimeDelta::days(30),
        vec![entity("الهلال", EntityType::Team)],
        positive(),
    )
    .await;
    seed_processed(&repo, "pending", "النصر يتعادل", now).await;

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    assert!(aggregate(&repo, &params).await.unwrap().is_none());
    assert!(repo.snapshots().is_empty());
    assert!(repo.trends().is_empty());
}

#[tokio::test]
async fn out_of_scope_entity_types_do_not_qualify() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    seed_enriched(
        &repo,
        "p1",
        "ميسي يتألق",
        "football",
        now,
        vec![entity("ليونيل ميسي", EntityType::Player)],
        positive(),
    )
    .await;

    let params = AggregateParams::new(7, vec![EntityType::Team]).at(now);
    assert!(aggregate(&repo, &params).await.unwrap().is_none());
}

#[tokio::test]
async fn sport_breakdown_keeps_top_entity_per_type_with_newest_samples() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    let mut hilal_ids = Vec::new();
    for i in 0..7 {
        hilal_ids.push(
            seed_enriched(
                &repo,
                &format!("h{i}"),
                "الهلال يفوز",
                "football",
                now - TimeDelta::minutes(i),
                vec![entity("الهلال", EntityType::Team)],
                positive(),
            )
            .await,
        );
    }
    seed_enriched(
        &repo,
        "n1",
        "النصر يتعادل",
        "football",
        now - TimeDelta::minutes(30),
        vec![entity("النصر", EntityType::Team)],
        positive(),
    )
    .await;
    for i in 0..2 {
        seed_enriched(
            &repo,
            &format!("w{i}"),
            "نهائي ويمبلدون",
            "tennis",
            now - TimeDelta::minutes(5),
            vec![entity("ويمبلدون", EntityType::Competition)],
            SentimentAnnotation::new(SentimentLabel::Neutral, 0.6),
        )
        .await;
    }

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    let snapshot = aggregate(&repo, &params).await.unwrap().expect("snapshot").snapshot;

    let football = snapshot.sport("football").expect("football");
    assert_eq!(football.total_items, 8);
    let team = &football.top_entities[&EntityType::Team];
    assert_eq!(team.text, "الهلال");
    assert_eq!(team.count, 7);
    let sample_ids: Vec<i64> = team.samples.iter().map(|s| s.processed_item_id).collect();
    assert_eq!(sample_ids, hilal_ids[..5].to_vec());
    assert!(!football.top_entities.contains_key(&EntityType::Competition));

    let tennis = snapshot.sport("tennis").expect("tennis");
    assert_eq!(tennis.top_entities[&EntityType::Competition].count, 2);
    assert_eq!(tennis.top_entities[&EntityType::Competition].sentiment.neutral, 2);

    let ranked: Vec<&str> = snapshot
        .global_trends
        .iter()
        .map(|t| t.entity_text.as_str())
        .collect();
    assert_eq!(ranked, vec!["الهلال", "ويمبلدون", "النصر"]);

    let team_detail = snapshot.entity_detail(EntityType::Team).expect("team detail");
    assert_eq!(team_detail.total_mentions, 8);
    assert_eq!(team_detail.top_entity.as_ref().map(|t| t.text.as_str()), Some("الهلال"));
    assert_eq!(team_detail.samples.len(), 5);
    let player_detail = snapshot.entity_detail(EntityType::Player).expect("player detail");
    assert_eq!(player_detail.total_mentions, 0);
    assert!(player_detail.top_entity.is_none());
}

#[tokio::test]
async fn error_sentiment_is_tallied_apart_from_the_average() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    seed_enriched(
        &repo,
        "ok",
        "الاهلي بطل",
        "football",
        now,
        vec![entity("الاهلي", EntityType::Team)],
        SentimentAnnotation::new(SentimentLabel::Positive, 0.9),
    )
    .await;
    seed_enriched(
        &repo,
        "bad",
        "الاهلي اليوم",
        "football",
        now,
        vec![entity("الاهلي", EntityType::Team)],
        SentimentAnnotation::error(),
    )
    .await;

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    let snapshot = aggregate(&repo, &params).await.unwrap().expect("snapshot").snapshot;

    let tally = &snapshot.global_trends[0].sentiment;
    assert_eq!(tally.positive, 1);
    assert_eq!(tally.error, 1);
    assert!((tally.average_score - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn dashboard_counts_hashtags_and_content_words() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    for (i, content) in ["#الهلال بطل الدوري", "#الهلال في القمة", "#النصر بطل"]
        .iter()
        .enumerate()
    {
        seed_enriched(
            &repo,
            &format!("d{i}"),
            content,
            "football",
            now,
            vec![entity("الهلال", EntityType::Team)],
            positive(),
        )
        .await;
    }

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    let dashboard = aggregate(&repo, &params).await.unwrap().expect("snapshot").snapshot.dashboard;

    let top = dashboard.top_hashtag.expect("hashtag");
    assert_eq!((top.tag.as_str(), top.count), ("الهلال", 2));
    let words: Vec<(&str, u64)> = dashboard
        .word_frequencies
        .iter()
        .map(|w| (w.word.as_str(), w.count))
        .collect();
    assert_eq!(words[0], ("الهلال", 2));
    assert!(words.contains(&("بطل", 2)));
    assert!(!words.iter().any(|(w, _)| *w == "في"));
    assert_eq!(dashboard.top_entities[&EntityType::Team].count, 3);
}

#[tokio::test]
async fn topics_record_co_mentioned_entities() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    for i in 0..3 {
        seed_enriched(
            &repo,
            &format!("c{i}"),
            "ريال مدريد وبرشلونة في الكلاسيكو",
            "football",
            now,
            vec![
                entity("ريال مدريد", EntityType::Team),
                entity("برشلونه", EntityType::Team),
            ],
            positive(),
        )
        .await;
    }

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    aggregate(&repo, &params).await.unwrap().expect("snapshot");

    let topics = repo.topics();
    let madrid = topics.iter().find(|t| t.name == "ريال مدريد").expect("topic");
    assert_eq!(madrid.keywords, vec!["ريال", "مدريد"]);
    assert_eq!(madrid.related_entities.len(), 1);
    assert_eq!(madrid.related_entities[0].text, "برشلونه");
}

#[tokio::test]
async fn out_of_range_windows_are_rejected_without_writes() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    seed_enriched(
        &repo,
        "w1",
        "الهلال يفوز",
        "football",
        now,
        vec![entity("الهلال", EntityType::Team)],
        positive(),
    )
    .await;

    for window_days in [0, MAX_WINDOW_DAYS + 1, u32::MAX] {
        let params = AggregateParams::new(window_days, ALL_TYPES.to_vec()).at(now);
        let result = aggregate(&repo, &params).await;
        assert!(
            matches!(result, Err(AggregateError::InvalidWindow(days)) if days == window_days),
            "window {window_days} should be rejected"
        );
    }

    let at_calendar_start =
        AggregateParams::new(1, ALL_TYPES.to_vec()).at(DateTime::<Utc>::MIN_UTC);
    assert!(matches!(
        aggregate(&repo, &at_calendar_start).await,
        Err(AggregateError::InvalidWindow(1))
    ));
    assert!(repo.snapshots().is_empty());

    let widest = AggregateParams::new(MAX_WINDOW_DAYS, ALL_TYPES.to_vec()).at(now);
    let snapshot = aggregate(&repo, &widest).await.unwrap().expect("snapshot").snapshot;
    assert_eq!(snapshot.window_days, MAX_WINDOW_DAYS);
    assert_eq!(
        snapshot.global_trends[0].daily_mentions.len(),
        MAX_WINDOW_DAYS as usize + 1
    );
}

#[tokio::test]
async fn shared_text_across_types_keeps_the_higher_ranked_trend() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    for i in 0..3 {
        seed_enriched(
            &repo,
            &format!("team{i}"),
            "الاهلي يفوز",
            "football",
            now,
            vec![entity("الاهلي", EntityType::Team)],
            positive(),
        )
        .await;
    }
    seed_enriched(
        &repo,
        "cup",
        "كاس الاهلي",
        "football",
        now,
        vec![entity("الاهلي", EntityType::Competition)],
        positive(),
    )
    .await;

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    let snapshot = aggregate(&repo, &params).await.unwrap().expect("snapshot").snapshot;

    assert_eq!(snapshot.global_trends.len(), 2);
    let trends = repo.trends();
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].topic_name, "الاهلي");
    assert_eq!(trends[0].metrics.comment_count, 3);
    assert_eq!(repo.topics().len(), 1);
}

#[tokio::test]
async fn entity_type_detail_counts_every_mention_and_samples_the_top_entity() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    let mut salah_ids = Vec::new();
    for i in 0..2 {
        salah_ids.push(
            seed_enriched(
                &repo,
                &format!("duo{i}"),
                "صلاح وماني معا",
                "football",
                now - TimeDelta::hours(2 + i),
                vec![
                    entity("محمد صلاح", EntityType::Player),
                    entity("ساديو ماني", EntityType::Player),
                ],
                positive(),
            )
            .await,
        );
    }
    salah_ids.push(
        seed_enriched(
            &repo,
            "solo",
            "صلاح يسجل",
            "football",
            now - TimeDelta::hours(5),
            vec![entity("محمد صلاح", EntityType::Player)],
            SentimentAnnotation::new(SentimentLabel::Negative, 0.7),
        )
        .await,
    );
    seed_enriched(
        &repo,
        "newest",
        "ميسي في الملعب",
        "football",
        now,
        vec![entity("ليونيل ميسي", EntityType::Player)],
        positive(),
    )
    .await;

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    let snapshot = aggregate(&repo, &params).await.unwrap().expect("snapshot").snapshot;
    let detail = snapshot.entity_detail(EntityType::Player).expect("player detail");

    assert_eq!(detail.total_mentions, 6);
    assert_eq!(detail.sentiment.positive, 5);
    assert_eq!(detail.sentiment.negative, 1);
    assert_eq!(
        detail.top_entity.as_ref().map(|t| t.text.as_str()),
        Some("محمد صلاح")
    );
    let sample_ids: Vec<i64> = detail.samples.iter().map(|s| s.processed_item_id).collect();
    assert_eq!(sample_ids, salah_ids);
}

#[tokio::test]
async fn short_pages_do_not_end_the_scan_early() {
    let inner = MemoryRepository::new();
    let now = Utc::now();
    for i in 0..5 {
        seed_enriched(
            &inner,
            &format!("s{i}"),
            "النصر يفوز",
            "football",
            now,
            vec![entity("النصر", EntityType::Team)],
            positive(),
        )
        .await;
    }
    let repo = FaultyRepository::new(inner, Fault::DropFirstOfPage);

    let mut params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    params.page_size = 2;
    let snapshot = aggregate(&repo, &params).await.unwrap().expect("snapshot").snapshot;

    // Pages [1, 2] and [3, 4] each lose one row; [5] loses its only row.
    assert_eq!(snapshot.global_trends[0].count, 2);
    assert_eq!(snapshot.dashboard.total_items, 2);
}

#[tokio::test]
async fn dashboard_hashtag_keeps_the_written_case() {
    let repo = MemoryRepository::new();
    let now = Utc::now();
    for (i, content) in ["#Salah هدف", "#Salah مرة اخرى", "#salah رائع"].iter().enumerate() {
        seed_enriched(
            &repo,
            &format!("tag{i}"),
            content,
            "football",
            now,
            vec![entity("محمد صلاح", EntityType::Player)],
            positive(),
        )
        .await;
    }

    let params = AggregateParams::new(7, ALL_TYPES.to_vec()).at(now);
    let dashboard = aggregate(&repo, &params).await.unwrap().expect("snapshot").snapshot.dashboard;

    let top = dashboard.top_hashtag.expect("hashtag");
    assert_eq!((top.tag.as_str(), top.count), ("Salah", 2));
}
