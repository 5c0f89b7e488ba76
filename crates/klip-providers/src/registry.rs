//! Platform-to-provider resolution.
//!
//! Closed enum dispatch over a static mapping: each supported platform has
//! exactly one provider, and the randomized stub for OTHER is an explicit,
//! logged, opt-in fallback — never an implicit default.

use std::sync::Arc;

use klip_core::{MetricRecord, Platform};

use crate::error::ProviderError;
use crate::instagram::InstagramProvider;
use crate::stub::{ManualProvider, StubProvider};
use crate::tiktok::TikTokProvider;
use crate::youtube::{ContentMetricRecord, YouTubeClient};

/// One resolved provider instance.
#[derive(Clone)]
pub enum Provider {
    Youtube(Arc<YouTubeClient>),
    Tiktok(TikTokProvider),
    Instagram(InstagramProvider),
    Stub(StubProvider),
    Manual(ManualProvider),
}

impl Provider {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Provider::Youtube(_) => "youtube",
            Provider::Tiktok(_) => "tiktok",
            Provider::Instagram(_) => "instagram",
            Provider::Stub(_) => "stub",
            Provider::Manual(_) => "manual",
        }
    }

    /// Fetches a normalized metric record for a content URL or handle.
    ///
    /// Never fails and never panics: providers absorb every external-API
    /// failure into a zero-valued record so this call is always safe on a
    /// user-facing path.
    pub async fn fetch_analytics(
        &self,
        reference: &str,
        access_token: Option<&str>,
    ) -> MetricRecord {
        match self {
            Provider::Youtube(client) => client.fetch_analytics(reference, access_token).await,
            Provider::Tiktok(p) => p.fetch_analytics(reference, access_token),
            Provider::Instagram(p) => p.fetch_analytics(reference, access_token),
            Provider::Stub(p) => p.fetch_analytics(reference),
            Provider::Manual(p) => p.fetch_analytics(reference),
        }
    }

    /// Whether the platform supports a per-upload content breakdown.
    #[must_use]
    pub fn supports_content_analytics(&self) -> bool {
        matches!(self, Provider::Youtube(_))
    }

    /// Fetches the per-upload breakdown for platforms that support it.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Unsupported`] for every platform except YouTube;
    /// otherwise as [`YouTubeClient::fetch_content_analytics`].
    pub async fn fetch_content_analytics(
        &self,
        access_token: Option<&str>,
        handle: &str,
        max_results: usize,
    ) -> Result<Vec<ContentMetricRecord>, ProviderError> {
        match self {
            Provider::Youtube(client) => {
                client
                    .fetch_content_analytics(access_token, handle, max_results)
                    .await
            }
            other => Err(ProviderError::Unsupported {
                platform: other.kind().to_owned(),
                operation: "content analytics",
            }),
        }
    }
}

/// Resolves a platform to its provider instance.
///
/// Built once at startup from the application config; cheap to clone.
#[derive(Clone)]
pub struct ProviderRegistry {
    youtube: Arc<YouTubeClient>,
    stub_metrics: bool,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(youtube: Arc<YouTubeClient>, stub_metrics: bool) -> Self {
        Self {
            youtube,
            stub_metrics,
        }
    }

    /// Direct access to the YouTube client for channel-identity lookups
    /// outside the metric-fetch contract (OAuth account linking).
    #[must_use]
    pub fn youtube(&self) -> Arc<YouTubeClient> {
        Arc::clone(&self.youtube)
    }

    /// Static platform mapping. `Other` resolves to the randomized stub only
    /// when `stub_metrics` is enabled, and logs every such resolution;
    /// otherwise it falls back to the zero-valued manual provider.
    #[must_use]
    pub fn resolve(&self, platform: Platform) -> Provider {
        match platform {
            Platform::Youtube => Provider::Youtube(Arc::clone(&self.youtube)),
            Platform::Tiktok => Provider::Tiktok(TikTokProvider),
            Platform::Instagram => Provider::Instagram(InstagramProvider),
            Platform::Other => {
                if self.stub_metrics {
                    tracing::warn!(
                        platform = %platform,
                        "resolving to randomized stub provider (stub_metrics enabled)"
                    );
                    Provider::Stub(StubProvider)
                } else {
                    Provider::Manual(ManualProvider)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;

    fn registry(stub_metrics: bool) -> ProviderRegistry {
        let youtube =
            Arc::new(YouTubeClient::new(None, 5, RetryPolicy::default(), false).unwrap());
        ProviderRegistry::new(youtube, stub_metrics)
    }

    #[test]
    fn real_platforms_resolve_to_their_providers() {
        let registry = registry(false);
        assert_eq!(registry.resolve(Platform::Youtube).kind(), "youtube");
        assert_eq!(registry.resolve(Platform::Tiktok).kind(), "tiktok");
        assert_eq!(registry.resolve(Platform::Instagram).kind(), "instagram");
    }

    #[test]
    fn other_defaults_to_manual_zeros() {
        assert_eq!(registry(false).resolve(Platform::Other).kind(), "manual");
    }

    #[test]
    fn other_resolves_to_stub_only_when_opted_in() {
        assert_eq!(registry(true).resolve(Platform::Other).kind(), "stub");
    }

    #[test]
    fn only_youtube_supports_content_analytics() {
        let registry = registry(false);
        assert!(registry
            .resolve(Platform::Youtube)
            .supports_content_analytics());
        assert!(!registry
            .resolve(Platform::Tiktok)
            .supports_content_analytics());
    }

    #[tokio::test]
    async fn content_analytics_on_unsupported_platform_errors() {
        let provider = registry(false).resolve(Platform::Instagram);
        let err = provider
            .fetch_content_analytics(None, "@someone", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));
    }
}
