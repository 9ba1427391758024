//! Normalize and enrichment stages against the in-memory repository.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{entity, new_raw, seed_processed, FixedExtractor, FixedScorer};
use sportrend_core::{EntityType, NewProcessedItem, SentimentLabel};
use sportrend_db::{MemoryRepository, Repository};
use sportrend_pipeline::{
    run_normalize_stage, run_stage, EntityStage, SentimentStage, StageOptions,
};

fn options(batch_size: usize, concurrency: usize) -> StageOptions {
    StageOptions {
        batch_size,
        concurrency,
        ..StageOptions::default()
    }
}

#[tokio::test]
async fn normalize_writes_processed_item_and_flags_raw() {
    let repo = MemoryRepository::new();
    let content = "هدف رائع من محمد صلاح https://t.co/x";
    let raw_id = repo
        .insert_raw_if_absent(new_raw("c1", content, "football", Utc::now()))
        .await
        .unwrap()
        .id();

    let report = run_normalize_stage(&repo, 10, None).await.unwrap();

    assert_eq!(report.normalized, 1);
    assert_eq!(report.empty, 0);
    let processed = repo.processed_for_raw(raw_id).expect("processed record");
    assert_eq!(processed.clean_text, "هدف رائع من محمد صلاح");
    assert!(!processed.is_analyzed_for_entities);
    assert!(repo.raw_items()[0].is_processed);

    let again = run_normalize_stage(&repo, 10, None).await.unwrap();
    assert_eq!(again.scanned, 0);
}

#[tokio::test]
async fn empty_content_is_excluded_and_raw_flag_reset() {
    let repo = MemoryRepository::new();
    let raw_id = repo
        .insert_raw_if_absent(new_raw("c2", "what a goal tonight!!", "football", Utc::now()))
        .await
        .unwrap()
        .id();
    repo.upsert_processed(NewProcessedItem {
        raw_item_id: raw_id,
        clean_text: "قديم".to_string(),
        normalized_text: "قديم".to_string(),
        tokens: vec!["قديم".to_string()],
        processed_at: Utc::now(),
    })
    .await
    .unwrap();

    let report = run_normalize_stage(&repo, 10, None).await.unwrap();

    assert_eq!(report.empty, 1);
    assert_eq!(report.normalized, 0);
    assert!(repo.processed_for_raw(raw_id).is_none());
    assert!(!repo.raw_items()[0].is_processed);
}

#[tokio::test]
async fn normalize_pages_through_small_batches() {
    let repo = MemoryRepository::new();
    for i in 0..7 {
        let item = new_raw(&format!("p{i}"), "الهلال يفوز بالمباراة", "football", Utc::now());
        repo.insert_raw_if_absent(item).await.unwrap();
    }
    let report = run_normalize_stage(&repo, 2, None).await.unwrap();
    assert_eq!(report.scanned, 7);
    assert_eq!(report.normalized, 7);
    assert_eq!(repo.processed_items().len(), 7);
}

#[tokio::test]
async fn entity_stage_annotates_each_item_once() {
    let repo = MemoryRepository::new();
    for i in 0..5 {
        seed_processed(&repo, &format!("e{i}"), "محمد صلاح يسجل", Utc::now()).await;
    }
    let extractor = Arc::new(FixedExtractor::new(vec![entity("محمد صلاح", EntityType::Player)]));
    let stage = EntityStage::new(Arc::<FixedExtractor>::clone(&extractor));

    let first = run_stage(&repo, &stage, &options(2, 2)).await.unwrap();
    assert_eq!(first.annotated, 5);
    assert_eq!(first.batches, 3);

    let second = run_stage(&repo, &stage, &options(2, 2)).await.unwrap();
    assert_eq!(second.claimed, 0);
    assert_eq!(extractor.calls(), 5);
    assert!(repo
        .processed_items()
        .iter()
        .all(|p| p.is_analyzed_for_entities && p.entities.len() == 1));
}

#[tokio::test]
async fn concurrent_runners_never_enrich_an_item_twice() {
    let repo = MemoryRepository::new();
    for i in 0..20 {
        seed_processed(&repo, &format!("k{i}"), "الهلال والنصر", Utc::now()).await;
    }
    let extractor = Arc::new(
        FixedExtractor::new(vec![entity("الهلال", EntityType::Team)])
            .with_delay(Duration::from_millis(5)),
    );
    let stage_a = EntityStage::new(Arc::<FixedExtractor>::clone(&extractor));
    let stage_b = EntityStage::new(Arc::<FixedExtractor>::clone(&extractor));
    let opts = options(3, 2);

    let (a, b) = tokio::join!(
        run_stage(&repo, &stage_a, &opts),
        run_stage(&repo, &stage_b, &opts)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.annotated + b.annotated, 20);
    assert_eq!(a.already_done + b.already_done, 0);
    assert_eq!(extractor.calls(), 20);
}

#[tokio::test]
async fn extraction_failure_is_recorded_and_not_retried() {
    let repo = MemoryRepository::new();
    let good = seed_processed(&repo, "f1", "الهلال بطل", Utc::now()).await;
    let bad = seed_processed(&repo, "f2", "عطل في النص", Utc::now()).await;
    let extractor = Arc::new(
        FixedExtractor::new(vec![entity("الهلال", EntityType::Team)]).failing_on("عطل"),
    );
    let stage = EntityStage::new(Arc::<FixedExtractor>::clone(&extractor));

    let report = run_stage(&repo, &stage, &options(10, 4)).await.unwrap();
    assert_eq!(report.annotated, 1);
    assert_eq!(report.failed, 1);

    let items = repo.processed_items();
    let failed = items.iter().find(|p| p.id == bad).unwrap();
    assert!(failed.is_analyzed_for_entities);
    assert!(failed.entities.is_empty());
    let ok = items.iter().find(|p| p.id == good).unwrap();
    assert_eq!(ok.entities.len(), 1);

    run_stage(&repo, &stage, &options(10, 4)).await.unwrap();
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn sentiment_waits_for_entities() {
    let repo = MemoryRepository::new();
    seed_processed(&repo, "s1", "مباراة رائعة", Utc::now()).await;
    seed_processed(&repo, "s2", "عطل كارثي", Utc::now()).await;
    let scorer = Arc::new(FixedScorer::new(SentimentLabel::Positive, 0.9).failing_on("عطل"));
    let sentiment = SentimentStage::new(Arc::<FixedScorer>::clone(&scorer));

    let early = run_stage(&repo, &sentiment, &options(10, 2)).await.unwrap();
    assert_eq!(early.claimed, 0);
    assert_eq!(scorer.calls(), 0);

    let entities = EntityStage::new(Arc::new(FixedExtractor::new(Vec::new())));
    run_stage(&repo, &entities, &options(10, 2)).await.unwrap();

    let report = run_stage(&repo, &sentiment, &options(10, 2)).await.unwrap();
    assert_eq!(report.annotated, 1);
    assert_eq!(report.failed, 1);

    let labels: Vec<SentimentLabel> = repo
        .processed_items()
        .iter()
        .map(|p| p.sentiment.expect("scored").label)
        .collect();
    assert!(labels.contains(&SentimentLabel::Positive));
    assert!(labels.contains(&SentimentLabel::Error));
}

#[tokio::test]
async fn passed_deadline_starts_no_batch() {
    let repo = MemoryRepository::new();
    seed_processed(&repo, "d1", "الهلال", Utc::now()).await;
    let extractor = Arc::new(FixedExtractor::new(Vec::new()));
    let stage = EntityStage::new(Arc::<FixedExtractor>::clone(&extractor));
    let opts = options(10, 1).with_deadline(Some(Instant::now()));

    let report = run_stage(&repo, &stage, &opts).await.unwrap();

    assert!(report.timed_out);
    assert_eq!(report.claimed, 0);
    assert_eq!(extractor.calls(), 0);
    assert!(!repo.processed_items()[0].is_analyzed_for_entities);
}
