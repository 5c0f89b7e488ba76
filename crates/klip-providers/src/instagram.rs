//! `Instagram` metric provider.
//!
//! The scraping approach was removed upstream and the Graph API insights
//! integration has not replaced it, so every fetch returns the zero record.

use klip_core::MetricRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct InstagramProvider;

impl InstagramProvider {
    pub fn fetch_analytics(self, reference: &str, _access_token: Option<&str>) -> MetricRecord {
        tracing::debug!(
            platform = "INSTAGRAM",
            reference,
            "no metric source available; returning zero metrics"
        );
        MetricRecord::zero()
    }
}
