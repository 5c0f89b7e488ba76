//! Per-platform analytics providers and their supporting clients.
//!
//! The metric-fetch boundary never fails: every provider absorbs external-API
//! errors into a zero-valued [`klip_core::MetricRecord`], logging the failure
//! with platform and reference. OAuth exchange, profile lookup, and content
//! analytics return proper errors because their callers must distinguish a
//! deployment defect from a user-correctable failure.

pub mod demo;
mod error;
mod instagram;
mod oauth;
mod profile;
mod registry;
mod retry;
mod stub;
mod tiktok;
mod youtube;

pub use error::ProviderError;
pub use instagram::InstagramProvider;
pub use oauth::{AuthorizeRequest, OAuthClient, OAuthCredentials, OAuthTokens};
pub use profile::ProfileClient;
pub use registry::{Provider, ProviderRegistry};
pub use retry::RetryPolicy;
pub use stub::{ManualProvider, StubProvider};
pub use tiktok::TikTokProvider;
pub use youtube::{classify_short, ChannelInfo, ContentMetricRecord, YouTubeClient};

use std::sync::Arc;

use klip_core::AppConfig;

/// Builds every provider client once from the startup configuration.
///
/// Returned pieces are cheap to clone and are shared across request
/// handlers and background tasks.
///
/// # Errors
///
/// Returns [`ProviderError`] if an HTTP client cannot be constructed.
pub fn build_from_config(
    config: &AppConfig,
) -> Result<(ProviderRegistry, OAuthClient, ProfileClient), ProviderError> {
    let retry = RetryPolicy {
        max_retries: config.provider_max_retries,
        backoff_base_ms: config.provider_retry_backoff_ms,
    };

    let youtube = Arc::new(YouTubeClient::new(
        config.youtube_api_key.clone(),
        config.provider_request_timeout_secs,
        retry,
        config.demo_mode,
    )?);
    let registry = ProviderRegistry::new(youtube, config.stub_metrics);

    let oauth = OAuthClient::new(
        OAuthCredentials {
            google_client_id: config.google_client_id.clone(),
            google_client_secret: config.google_client_secret.clone(),
            tiktok_client_key: config.tiktok_client_key.clone(),
            tiktok_client_secret: config.tiktok_client_secret.clone(),
            instagram_app_id: config.instagram_app_id.clone(),
            instagram_app_secret: config.instagram_app_secret.clone(),
        },
        config.oauth_redirect_uri(),
        config.provider_request_timeout_secs,
        retry,
    )?;

    let profile = ProfileClient::new(
        config.profile_api_key.clone(),
        &config.profile_api_host,
        config.provider_request_timeout_secs,
        retry,
    )?;

    Ok((registry, oauth, profile))
}
