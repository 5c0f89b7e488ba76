//! Offline unit tests for klip-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use klip_core::{AppConfig, Environment, MetricRecord};
use klip_db::{AnalyticsSnapshotRow, ConnectedAccountRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        provider_request_timeout_secs: 30,
        provider_max_retries: 2,
        provider_retry_backoff_ms: 500,
        youtube_api_key: None,
        google_client_id: None,
        google_client_secret: None,
        tiktok_client_key: None,
        tiktok_client_secret: None,
        instagram_app_id: None,
        instagram_app_secret: None,
        profile_api_key: None,
        profile_api_host: "profile.example.com".to_string(),
        oauth_redirect_origin: "http://localhost:5173".to_string(),
        demo_mode: false,
        stub_metrics: false,
    }
}

fn account_row() -> ConnectedAccountRow {
    ConnectedAccountRow {
        id: 1,
        public_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        platform: "YOUTUBE".to_string(),
        handle: "@creator".to_string(),
        profile_url: "https://youtube.com/@creator".to_string(),
        status: "VERIFIED".to_string(),
        verification_code: Some("AB12CD".to_string()),
        verified_at: Some(Utc::now()),
        verification_note: String::new(),
        access_token: None,
        refresh_token: None,
        token_expires_at: None,
        latest_metrics: None,
        last_synced_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn account_row_parses_platform_and_status() {
    let row = account_row();
    assert_eq!(row.platform().unwrap(), klip_core::Platform::Youtube);
    assert!(row.is_verified());
}

#[test]
fn cached_metrics_round_trip_through_jsonb_value() {
    let mut row = account_row();
    let record = MetricRecord {
        views: 1200,
        likes: 30,
        comments: 2,
        shares: 0,
        extra: serde_json::Map::new(),
    };
    row.latest_metrics = Some(serde_json::to_value(&record).unwrap());
    assert_eq!(row.cached_metrics().unwrap(), record);

    row.latest_metrics = None;
    assert!(row.cached_metrics().is_none());
}

#[test]
fn expired_token_reads_as_absent() {
    let now = Utc::now();
    let mut row = account_row();
    row.access_token = Some("token".to_string());

    row.token_expires_at = Some(now + chrono::Duration::hours(1));
    assert_eq!(row.usable_access_token(now), Some("token"));

    row.token_expires_at = Some(now - chrono::Duration::seconds(1));
    assert_eq!(row.usable_access_token(now), None);

    // No recorded expiry: token is trusted as-is.
    row.token_expires_at = None;
    assert_eq!(row.usable_access_token(now), Some("token"));
}

#[test]
fn snapshot_row_views_convert_to_unsigned() {
    let row = AnalyticsSnapshotRow {
        id: 1,
        submission_id: 2,
        fetched_at: Utc::now(),
        views: 2500,
        likes: 10,
        comments: 1,
        shares: 0,
        extra_data: serde_json::json!({}),
    };
    assert_eq!(row.views_u64(), 2500);
}
