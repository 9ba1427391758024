//! Integration tests for `HttpFeedClient` using wiremock HTTP mocks.

use sportrend_collector::{FeedError, FeedQuery, FeedSource, HttpFeedClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> HttpFeedClient {
    HttpFeedClient::new(base_url, Some("test-key".to_string()), 5, "sportrend-test")
        .expect("client construction should not fail")
}

fn query() -> FeedQuery {
    FeedQuery {
        query: "#الهلال".to_string(),
        sport_type: "football".to_string(),
        min_likes: 0,
        page_size: 20,
    }
}

#[tokio::test]
async fn fetch_page_parses_items_and_cursor() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [
            {
                "id": "c1",
                "parent_id": "v9",
                "text": "الهلال يفوز بالمباراة النهائية",
                "author_name": "fan",
                "likes": 12,
                "created_at": "2025-03-01T10:00:00Z"
            },
            { "id": "c2", "text": "مباراة رائعة جدا" }
        ],
        "next_cursor": "page-2"
    });

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "#الهلال"))
        .and(query_param("limit", "20"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client
        .fetch_page(&query(), None)
        .await
        .expect("page should parse");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next_cursor.as_deref(), Some("page-2"));
    let first = page.items[0].as_ref().expect("first item should decode");
    assert_eq!(first.id.as_deref(), Some("c1"));
    assert_eq!(first.likes, 12);
    assert!(first.created_at.is_some());
    let second = page.items[1].as_ref().expect("second item should decode");
    assert_eq!(second.likes, 0);
}

#[tokio::test]
async fn cursor_is_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("cursor", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client
        .fetch_page(&query(), Some("page-2"))
        .await
        .expect("page should parse");

    assert!(page.items.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn malformed_item_fails_alone() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [
            { "id": "bad", "likes": "many" },
            { "id": "good", "text": "الهلال يفوز بالمباراة النهائية" }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client
        .fetch_page(&query(), None)
        .await
        .expect("page should parse");

    assert!(matches!(page.items[0], Err(FeedError::MalformedItem(_))));
    assert!(page.items[1].is_ok());
}

#[tokio::test]
async fn status_429_is_rate_limited_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_page(&query(), None)
        .await
        .expect_err("429 should fail");

    assert!(err.is_rate_limited());
    assert!(matches!(
        err,
        FeedError::RateLimited {
            retry_after_secs: Some(30)
        }
    ));
}

#[tokio::test]
async fn server_error_is_transient_and_not_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_page(&query(), None)
        .await
        .expect_err("503 should fail");

    assert!(matches!(err, FeedError::Transient(_)));
    assert!(!err.is_rate_limited());
}

#[tokio::test]
async fn client_error_is_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_page(&query(), None)
        .await
        .expect_err("401 should fail");

    assert!(matches!(err, FeedError::UnexpectedStatus { status: 401, .. }));
}

#[tokio::test]
async fn invalid_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_page(&query(), None)
        .await
        .expect_err("html should fail");

    assert!(matches!(err, FeedError::Deserialize { .. }));
}
