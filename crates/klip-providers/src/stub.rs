//! Stub and manual metric providers.

use klip_core::MetricRecord;
use rand::Rng;

/// Returns randomized plausible metrics to simulate growth in demos.
///
/// Explicitly not for production: the registry only resolves to this
/// provider when `stub_metrics` is enabled in config.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubProvider;

impl StubProvider {
    pub fn fetch_analytics(self, _reference: &str) -> MetricRecord {
        let mut rng = rand::rng();
        MetricRecord {
            views: rng.random_range(100..=10_000),
            likes: rng.random_range(10..=1_000),
            comments: rng.random_range(0..=100),
            shares: rng.random_range(0..=50),
            extra: serde_json::Map::new(),
        }
    }
}

/// Always returns the zero record, for manually tracked content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualProvider;

impl ManualProvider {
    pub fn fetch_analytics(self, _reference: &str) -> MetricRecord {
        MetricRecord::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_values_stay_in_documented_ranges() {
        for _ in 0..100 {
            let record = StubProvider.fetch_analytics("anything");
            assert!((100..=10_000).contains(&record.views));
            assert!((10..=1_000).contains(&record.likes));
            assert!(record.comments <= 100);
            assert!(record.shares <= 50);
        }
    }

    #[test]
    fn manual_is_always_zero() {
        assert_eq!(
            ManualProvider.fetch_analytics("anything"),
            MetricRecord::zero()
        );
    }
}
