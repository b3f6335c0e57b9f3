//! X search adapter tests against a local mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clipscout::adapters::{PostSource, XConfig, XSearchClient};
use clipscout::error::CollaboratorError;

fn client(server: &MockServer) -> XSearchClient {
    XSearchClient::new(XConfig {
        base_url: server.uri(),
        bearer_token: Some("test-token".to_string()),
        timeout: Duration::from_secs(5),
        videos_only: true,
    })
    .expect("failed to build test client")
}

fn one_video_page() -> serde_json::Value {
    json!({
        "data": [{
            "id": "900",
            "text": "last-second winner",
            "author_id": "u9",
            "created_at": "2025-10-05T12:00:00.000Z",
            "attachments": { "media_keys": ["7_900"] }
        }],
        "includes": {
            "media": [{
                "media_key": "7_900",
                "type": "video",
                "variants": [
                    { "bit_rate": 632000, "content_type": "video/mp4", "url": "https://video.example/900-low.mp4" },
                    { "bit_rate": 2176000, "content_type": "video/mp4", "url": "https://video.example/900-high.mp4" }
                ]
            }],
            "users": [{ "id": "u9", "username": "footy" }]
        },
        "meta": { "result_count": 1 }
    })
}

#[tokio::test]
async fn test_search_returns_posts_with_joined_media() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("query", "winner goal has:videos -is:retweet"))
        .and(query_param("max_results", "15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_video_page()))
        .expect(1)
        .mount(&server)
        .await;

    let posts = client(&server).search("winner goal", 15).await.unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].url(), "https://x.com/footy/status/900");
    assert_eq!(
        posts[0].best_video_url().as_deref(),
        Some("https://video.example/900-high.mp4")
    );
}

#[tokio::test]
async fn test_search_page_size_is_clamped_to_api_minimum() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("max_results", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meta": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let posts = client(&server).search("anything", 3).await.unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_search_maps_429_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let result = client(&server).search("anything", 10).await;
    assert!(matches!(result, Err(CollaboratorError::RateLimited(_))));
}

#[tokio::test]
async fn test_search_maps_401_to_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server).search("anything", 10).await;
    assert!(matches!(result, Err(CollaboratorError::Auth(_))));
}

#[tokio::test]
async fn test_search_maps_503_to_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server).search("anything", 10).await;
    assert!(matches!(result, Err(CollaboratorError::Transient(_))));
}

#[tokio::test]
async fn test_search_maps_garbage_body_to_format_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client(&server).search("anything", 10).await;
    assert!(matches!(result, Err(CollaboratorError::UpstreamFormat(_))));
}
