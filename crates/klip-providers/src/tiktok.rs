//! `TikTok` metric provider.
//!
//! The Display API video-query integration is not wired up yet: the provider
//! acknowledges the access token it will eventually need and returns a
//! deterministic zero record either way.

use klip_core::MetricRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct TikTokProvider;

impl TikTokProvider {
    /// Returns a zero record. Logs a warning when called without the access
    /// token the real integration will require.
    pub fn fetch_analytics(self, reference: &str, access_token: Option<&str>) -> MetricRecord {
        if access_token.is_none() {
            tracing::warn!(
                platform = "TIKTOK",
                reference,
                "metric fetch requires an access token; returning zero metrics"
            );
        } else {
            tracing::debug!(
                platform = "TIKTOK",
                reference,
                "video-query API not integrated; returning zero metrics"
            );
        }
        MetricRecord::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_returns_zero_record() {
        let provider = TikTokProvider;
        assert_eq!(
            provider.fetch_analytics("https://tiktok.com/@x/video/1", None),
            MetricRecord::zero()
        );
        assert_eq!(
            provider.fetch_analytics("https://tiktok.com/@x/video/1", Some("token")),
            MetricRecord::zero()
        );
    }
}
