use harvest_core::{CoreError, RedditApiError};
use reddit_client::api::{RedditApiClient, MAX_PAGE_SIZE};
use serde_json::{json, Value};
use std::ops::Range;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn post(subreddit: &str, index: usize) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": format!("p{}", index),
            "title": format!("Post {}", index),
            "author": "alice",
            "subreddit": subreddit,
            "permalink": format!("/r/{}/comments/p{}/", subreddit, index),
            "score": index,
            "num_comments": 0
        }
    })
}

fn listing(children: Vec<Value>, after: Option<&str>) -> Value {
    json!({
        "kind": "Listing",
        "data": {
            "after": after,
            "before": null,
            "dist": children.len(),
            "children": children
        }
    })
}

fn page(subreddit: &str, range: Range<usize>, after: Option<&str>) -> Value {
    listing(range.map(|i| post(subreddit, i)).collect(), after)
}

fn client_for(server: &MockServer) -> RedditApiClient {
    RedditApiClient::with_base_url("listing-tests/0.1".to_string(), &server.uri()).unwrap()
}

#[tokio::test]
async fn test_hot_listing_walks_pages_until_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/rust/hot"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("limit", MAX_PAGE_SIZE.to_string()))
        .and(query_param("raw_json", "1"))
        .and(query_param_is_missing("after"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page("rust", 0..100, Some("t3_p99"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/rust/hot"))
        .and(query_param("limit", "50"))
        .and(query_param("after", "t3_p99"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page("rust", 100..150, Some("t3_p149"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let posts = client.get_hot_posts(TOKEN, "rust", 150).await.unwrap();

    assert_eq!(posts.len(), 150);
    assert_eq!(posts[0].id, "p0");
    assert_eq!(posts[149].id, "p149");

    let metrics = client.get_metrics().await;
    assert_eq!(metrics.total_requests, 2);
    assert_eq!(metrics.successful_requests, 2);
}

#[tokio::test]
async fn test_listing_that_ends_early_stops_paging() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/tiny/hot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("tiny", 0..30, None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let posts = client_for(&mock_server)
        .get_hot_posts(TOKEN, "tiny", 150)
        .await
        .unwrap();
    assert_eq!(posts.len(), 30);
}

#[tokio::test]
async fn test_oversized_page_is_truncated_to_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/rust/hot"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("rust", 0..8, Some("t3_p7"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let posts = client_for(&mock_server)
        .get_hot_posts(TOKEN, "rust", 5)
        .await
        .unwrap();
    assert_eq!(posts.len(), 5);
    assert_eq!(posts[4].id, "p4");
}

#[tokio::test]
async fn test_non_submission_children_are_skipped() {
    let mock_server = MockServer::start().await;

    let children = vec![
        post("rust", 0),
        json!({"kind": "t1", "data": {"id": "c1", "body": "a comment"}}),
        json!({"kind": "more", "data": {"count": 12, "children": ["x", "y"]}}),
        post("rust", 1),
    ];
    Mock::given(method("GET"))
        .and(path("/r/rust/hot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(children, None)))
        .mount(&mock_server)
        .await;

    let posts = client_for(&mock_server)
        .get_hot_posts(TOKEN, "rust", 10)
        .await
        .unwrap();
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p0", "p1"]);
}

#[tokio::test]
async fn test_search_sends_query_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/rust/search"))
        .and(query_param("q", "async traits"))
        .and(query_param("restrict_sr", "on"))
        .and(query_param("sort", "relevance"))
        .and(query_param("t", "all"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("rust", 0..3, Some("t3_p2"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let posts = client_for(&mock_server)
        .search_posts(TOKEN, "rust", "async traits", 3)
        .await
        .unwrap();
    assert_eq!(posts.len(), 3);
}

#[tokio::test]
async fn test_rate_limit_response_carries_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/busy/hot"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "17"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    match client.get_hot_posts(TOKEN, "busy", 10).await {
        Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })) => {
            assert_eq!(retry_after, 17)
        }
        other => panic!("Expected RateLimitExceeded, got {:?}", other),
    }

    let metrics = client.get_metrics().await;
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.rate_limited_requests, 1);
}

#[tokio::test]
async fn test_error_statuses_map_to_api_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/nosuchforum/hot"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    match client.get_hot_posts(TOKEN, "nosuchforum", 10).await {
        Err(CoreError::RedditApi(RedditApiError::SubredditNotFound { subreddit })) => {
            assert_eq!(subreddit, "nosuchforum")
        }
        other => panic!("Expected SubredditNotFound, got {:?}", other),
    }

    assert!(matches!(
        client.get_user_info(TOKEN).await,
        Err(CoreError::RedditApi(RedditApiError::InvalidToken))
    ));
}
