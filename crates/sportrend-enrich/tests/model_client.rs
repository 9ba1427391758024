//! Integration tests for `ModelClient` using wiremock HTTP mocks.

use sportrend_core::{EntityType, SentimentLabel};
use sportrend_enrich::{EnrichError, EntityExtractor, ModelClient, SentimentScorer};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> ModelClient {
    ModelClient::new(base_url, 5, "sportrend-test").expect("client construction should not fail")
}

#[tokio::test]
async fn extract_maps_ner_groups_and_drops_unknown() {
    let server = MockServer::start().await;

    let body = serde_json::json!([[
        { "entity_group": "PER", "word": "محمد صلاح", "start": 0, "end": 9, "score": 0.98 },
        { "entity_group": "ORG", "word": "ليفربول", "start": 14, "end": 21, "score": 0.91 },
        { "entity_group": "MISC", "word": "هدف", "start": 22, "end": 25, "score": 0.5 }
    ]]);

    Mock::given(method("POST"))
        .and(path("/ner"))
        .and(body_json(serde_json::json!({ "inputs": ["محمد صلاح يسجل لليفربول"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let entities = client
        .extract("محمد صلاح يسجل لليفربول")
        .await
        .expect("extraction should succeed");

    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].entity_type, EntityType::Player);
    assert_eq!(entities[0].text, "محمد صلاح");
    assert_eq!(entities[0].span.end, 9);
    assert_eq!(entities[1].entity_type, EntityType::Team);
}

#[tokio::test]
async fn score_batch_maps_best_label_per_input() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        [
            { "label": "LABEL_0", "score": 0.05 },
            { "label": "LABEL_1", "score": 0.9 },
            { "label": "LABEL_2", "score": 0.05 }
        ],
        [
            { "label": "LABEL_0", "score": 0.8 },
            { "label": "LABEL_1", "score": 0.1 },
            { "label": "LABEL_2", "score": 0.1 }
        ]
    ]);

    Mock::given(method("POST"))
        .and(path("/sentiment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let scored = client
        .score_batch(&["فوز رائع", "خساره مؤلمه"])
        .await
        .expect("scoring should succeed");

    assert_eq!(scored.len(), 2);
    assert_eq!(scored[0].label, SentimentLabel::Positive);
    assert!((scored[0].score - 0.9).abs() < 1e-9);
    assert_eq!(scored[1].label, SentimentLabel::Negative);
}

#[tokio::test]
async fn result_count_mismatch_is_a_model_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sentiment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .score("فوز")
        .await
        .expect_err("empty response should fail");

    assert!(matches!(err, EnrichError::Model(_)));
}

#[tokio::test]
async fn server_error_is_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ner"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .extract("نص")
        .await
        .expect_err("500 should fail");

    assert!(matches!(err, EnrichError::UnexpectedStatus { status: 500, .. }));
}

#[tokio::test]
async fn unknown_sentiment_label_is_a_model_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sentiment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([[{ "label": "LABEL_9", "score": 1.0 }]])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .score("نص")
        .await
        .expect_err("unknown label should fail");

    assert!(matches!(err, EnrichError::Model(_)));
}
