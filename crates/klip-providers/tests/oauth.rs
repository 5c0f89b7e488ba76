//! Integration tests for `OAuthClient` token exchange using wiremock.

use klip_core::Platform;
use klip_providers::{OAuthClient, OAuthCredentials, ProviderError, RetryPolicy};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn full_credentials() -> OAuthCredentials {
    OAuthCredentials {
        google_client_id: Some("google-id".to_owned()),
        google_client_secret: Some("google-secret".to_owned()),
        tiktok_client_key: Some("tiktok-key".to_owned()),
        tiktok_client_secret: Some("tiktok-secret".to_owned()),
        instagram_app_id: Some("ig-id".to_owned()),
        instagram_app_secret: Some("ig-secret".to_owned()),
    }
}

fn test_client(server: &MockServer, creds: OAuthCredentials) -> OAuthClient {
    OAuthClient::with_token_endpoints(
        creds,
        "https://app.example.com/integrations/callback".to_owned(),
        30,
        RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 0,
        },
        &format!("{}/google/token", server.uri()),
        &format!("{}/tiktok/token", server.uri()),
        &format!("{}/instagram/token", server.uri()),
    )
    .expect("client construction should not fail")
}

#[tokio::test]
async fn tiktok_exchange_returns_tokens_and_open_id() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "access_token": "tiktok-at",
        "refresh_token": "tiktok-rt",
        "expires_in": 86400,
        "open_id": "open-id-123"
    });

    Mock::given(method("POST"))
        .and(path("/tiktok/token"))
        .and(body_string_contains("client_key=tiktok-key"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server, full_credentials());
    let tokens = client
        .exchange_code(Platform::Tiktok, "auth-code")
        .await
        .expect("exchange should succeed");

    assert_eq!(tokens.access_token, "tiktok-at");
    assert_eq!(tokens.refresh_token.as_deref(), Some("tiktok-rt"));
    assert_eq!(tokens.expires_in, Some(86400));
    assert_eq!(tokens.open_id.as_deref(), Some("open-id-123"));
}

#[tokio::test]
async fn youtube_exchange_posts_form_credentials() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "access_token": "google-at",
        "refresh_token": "google-rt",
        "expires_in": 3600
    });

    Mock::given(method("POST"))
        .and(path("/google/token"))
        .and(body_string_contains("client_id=google-id"))
        .and(body_string_contains("client_secret=google-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server, full_credentials());
    let tokens = client
        .exchange_code(Platform::Youtube, "auth-code")
        .await
        .expect("exchange should succeed");
    assert_eq!(tokens.access_token, "google-at");
    assert_eq!(tokens.expires_in, Some(3600));
}

#[tokio::test]
async fn instagram_exchange_uses_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/instagram/token"))
        .and(query_param("client_id", "ig-id"))
        .and(query_param("code", "auth-code"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "ig-at" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server, full_credentials());
    let tokens = client
        .exchange_code(Platform::Instagram, "auth-code")
        .await
        .expect("exchange should succeed");
    assert_eq!(tokens.access_token, "ig-at");
    assert!(tokens.refresh_token.is_none());
}

#[tokio::test]
async fn rejected_code_surfaces_platform_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tiktok/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "error": "invalid_grant" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server, full_credentials());
    let err = client
        .exchange_code(Platform::Tiktok, "bad-code")
        .await
        .unwrap_err();

    match err {
        ProviderError::TokenExchange { platform, detail } => {
            assert_eq!(platform, "TIKTOK");
            assert!(detail.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_secret_fails_before_any_request() {
    let server = MockServer::start().await;
    // No mocks mounted: a request would 404 and fail differently.

    let creds = OAuthCredentials {
        google_client_secret: None,
        ..full_credentials()
    };
    let client = test_client(&server, creds);
    let err = client
        .exchange_code(Platform::Youtube, "auth-code")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::MissingCredential {
            credential: "GOOGLE_CLIENT_SECRET",
            ..
        }
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}
