//! Integration tests for `ProfileClient` using wiremock.

use klip_providers::{ProfileClient, ProviderError, RetryPolicy};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> ProfileClient {
    ProfileClient::with_base_url(
        Some("profile-key".to_owned()),
        "profile.example.com",
        30,
        RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 0,
        },
        base_url,
    )
    .expect("client construction should not fail")
}

#[tokio::test]
async fn biography_is_read_from_user_payload() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "user": {
            "username": "some_user",
            "biography": "Creator of things. Code: AB12CD"
        }
    });

    Mock::given(method("GET"))
        .and(path("/ig/info_username/"))
        .and(query_param("user", "some_user"))
        .and(header("X-RapidAPI-Key", "profile-key"))
        .and(header("X-RapidAPI-Host", "profile.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let bio = client
        .fetch_biography("some_user")
        .await
        .expect("lookup should succeed");
    assert_eq!(bio, "Creator of things. Code: AB12CD");
}

#[tokio::test]
async fn missing_biography_reads_as_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ig/info_username/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "user": {} })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let bio = client.fetch_biography("some_user").await.unwrap();
    assert_eq!(bio, "");
}

#[tokio::test]
async fn lookup_failure_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ig/info_username/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("profile not found"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.fetch_biography("nobody").await.unwrap_err();
    match err {
        ProviderError::ProfileLookup { status, detail } => {
            assert_eq!(status, 404);
            assert!(detail.contains("profile not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
