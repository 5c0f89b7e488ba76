//! Integration tests for `YouTubeClient` using wiremock HTTP mocks.

use klip_core::MetricRecord;
use klip_providers::{RetryPolicy, YouTubeClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn keyed_client(base_url: &str) -> YouTubeClient {
    YouTubeClient::with_base_url(
        Some("test-key".to_owned()),
        30,
        RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 0,
        },
        false,
        base_url,
    )
    .expect("client construction should not fail")
}

#[tokio::test]
async fn video_url_fetch_parses_statistics() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [{
            "id": "XYZ",
            "statistics": {
                "viewCount": "2500",
                "likeCount": "120",
                "commentCount": "14"
            }
        }]
    });

    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("part", "statistics"))
        .and(query_param("id", "XYZ"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let record = client
        .fetch_analytics("https://www.youtube.com/watch?v=XYZ", None)
        .await;

    assert_eq!(record.views, 2500);
    assert_eq!(record.likes, 120);
    assert_eq!(record.comments, 14);
    // The Data API exposes no share counts.
    assert_eq!(record.shares, 0);
}

#[tokio::test]
async fn oauth_token_takes_precedence_over_api_key() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [{
            "id": "XYZ",
            "statistics": { "viewCount": "10", "likeCount": "1", "commentCount": "0" }
        }]
    });

    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let record = client
        .fetch_analytics("https://youtu.be/XYZ", Some("user-token"))
        .await;
    assert_eq!(record.views, 10);
}

#[tokio::test]
async fn handle_reference_falls_back_to_channel_statistics() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [{
            "id": "UC123",
            "snippet": {
                "title": "Some Creator",
                "thumbnails": { "default": { "url": "https://img.example.com/t.jpg" } }
            },
            "statistics": {
                "viewCount": "99000",
                "subscriberCount": "1200",
                "videoCount": "85"
            }
        }]
    });

    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("forHandle", "@somecreator"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let record = client.fetch_analytics("@somecreator", None).await;

    assert_eq!(record.views, 99_000);
    assert_eq!(record.extra["subscribers"], 1200);
    assert_eq!(record.extra["video_count"], 85);
    assert_eq!(record.extra["title"], "Some Creator");
    assert_eq!(record.extra["thumbnail"], "https://img.example.com/t.jpg");
}

#[tokio::test]
async fn unknown_video_id_yields_zero_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let record = client
        .fetch_analytics("https://www.youtube.com/watch?v=missing", None)
        .await;
    assert_eq!(record, MetricRecord::zero());
}

#[tokio::test]
async fn api_failure_is_absorbed_into_zero_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let record = client
        .fetch_analytics("https://www.youtube.com/watch?v=XYZ", None)
        .await;
    assert_eq!(record, MetricRecord::zero());
}

#[tokio::test]
async fn content_analytics_walks_uploads_playlist() {
    let server = MockServer::start().await;

    let channel_body = serde_json::json!({
        "items": [{
            "id": "UC123",
            "snippet": { "title": "Some Creator" },
            "statistics": { "viewCount": "99000" },
            "contentDetails": { "relatedPlaylists": { "uploads": "UU123" } }
        }]
    });
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("forHandle", "@somecreator"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&channel_body))
        .mount(&server)
        .await;

    let playlist_body = serde_json::json!({
        "items": [
            { "contentDetails": { "videoId": "vid-1" } },
            { "contentDetails": { "videoId": "vid-2" } }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("playlistId", "UU123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&playlist_body))
        .mount(&server)
        .await;

    let videos_body = serde_json::json!({
        "items": [
            {
                "id": "vid-1",
                "snippet": {
                    "title": "Quick tip",
                    "publishedAt": "2026-07-01T12:00:00Z",
                    "thumbnails": { "default": { "url": "https://img.example.com/1.jpg" } }
                },
                "statistics": { "viewCount": "5000", "likeCount": "400", "commentCount": "12" },
                "contentDetails": { "duration": "PT48S" }
            },
            {
                "id": "vid-2",
                "snippet": { "title": "Deep dive", "description": "long form" },
                "statistics": { "viewCount": "800", "likeCount": "90", "commentCount": "7" },
                "contentDetails": { "duration": "PT14M2S" }
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "vid-1,vid-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&videos_body))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let content = client
        .fetch_content_analytics(None, "@somecreator", 25)
        .await
        .expect("content analytics should parse");

    assert_eq!(content.len(), 2);
    assert_eq!(content[0].id, "vid-1");
    assert!(content[0].is_short, "sub-minute upload should classify short");
    assert_eq!(content[0].views, 5000);
    assert_eq!(content[1].id, "vid-2");
    assert!(!content[1].is_short);
    assert_eq!(content[1].duration.as_deref(), Some("PT14M2S"));
}

#[tokio::test]
async fn content_analytics_for_unknown_channel_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let content = client
        .fetch_content_analytics(None, "@nobody", 25)
        .await
        .expect("empty channel should not error");
    assert!(content.is_empty());
}

#[tokio::test]
async fn channel_info_reads_custom_url() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [{
            "id": "UC123",
            "snippet": { "title": "Some Creator", "customUrl": "@somecreator" },
            "statistics": {}
        }]
    });
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("mine", "true"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = keyed_client(&server.uri());
    let info = client
        .channel_info("user-token")
        .await
        .expect("channel info should parse")
        .expect("channel should exist");
    assert_eq!(info.channel_id, "UC123");
    assert_eq!(info.title, "Some Creator");
    assert_eq!(info.custom_url.as_deref(), Some("@somecreator"));
}

#[tokio::test]
async fn demo_mode_serves_canned_records_without_network() {
    // No mock server at all: a network call would fail the test with a
    // connection error rather than return the canned record.
    let client = YouTubeClient::with_base_url(
        None,
        5,
        RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 0,
        },
        true,
        "http://127.0.0.1:9",
    )
    .unwrap();

    let record = client.fetch_analytics("@SchoolbyGanesh", None).await;
    assert!(record.views > 0);
    assert_eq!(record.extra["title"], "School by Ganesh");

    let content = client
        .fetch_content_analytics(None, "@SchoolbyGanesh", 10)
        .await
        .expect("canned content list");
    assert!(!content.is_empty());
}

#[tokio::test]
async fn demo_handles_are_ignored_when_demo_mode_is_off() {
    // Same unreachable endpoint, demo mode off: the fetch goes to the
    // network, fails, and is absorbed into the zero record.
    let client = YouTubeClient::with_base_url(
        Some("test-key".to_owned()),
        1,
        RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 0,
        },
        false,
        "http://127.0.0.1:9",
    )
    .unwrap();

    let record = client.fetch_analytics("@SchoolbyGanesh", None).await;
    assert_eq!(record, MetricRecord::zero());
}
