//! Normalized metric record and the cache-staleness policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cached account metrics older than this are considered stale.
pub const STALENESS_WINDOW_SECS: i64 = 3600;

/// Normalized engagement counters for one piece of content or one account.
///
/// Immutable once produced: a fresh fetch builds a new record, it never
/// mutates a prior one. Counters are always non-negative; platforms that
/// cannot supply a counter report it as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    /// Optional platform extras: `subscribers`, `video_count`, `title`,
    /// `thumbnail`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl MetricRecord {
    /// The all-zero record, returned whenever a provider cannot or will not
    /// reach its platform API.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            views: 0,
            likes: 0,
            comments: 0,
            shares: 0,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_owned(), value.into());
        self
    }
}

/// Decide whether a cached metric record must be refreshed.
///
/// Stale when there is no cached record, no sync timestamp, or the last sync
/// is strictly older than [`STALENESS_WINDOW_SECS`]. A read served from a
/// fresh cache makes no network call at all.
#[must_use]
pub fn cache_is_stale(
    has_cached_record: bool,
    last_synced_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if !has_cached_record {
        return true;
    }
    match last_synced_at {
        None => true,
        Some(synced) => (now - synced).num_seconds() > STALENESS_WINDOW_SECS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn zero_record_has_no_extras() {
        let record = MetricRecord::zero();
        assert_eq!(record.views, 0);
        assert_eq!(record.likes, 0);
        assert_eq!(record.comments, 0);
        assert_eq!(record.shares, 0);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn serde_round_trip_preserves_extras() {
        let record = MetricRecord {
            views: 1200,
            likes: 34,
            comments: 5,
            shares: 1,
            extra: Map::new(),
        }
        .with_extra("subscribers", 99_u64)
        .with_extra("title", "My Channel");

        let json = serde_json::to_value(&record).unwrap();
        let back: MetricRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.extra["subscribers"], 99);
    }

    #[test]
    fn zero_record_serializes_without_extra_key() {
        let json = serde_json::to_value(MetricRecord::zero()).unwrap();
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn stale_just_past_the_window() {
        let now = Utc::now();
        let synced = now - Duration::seconds(3601);
        assert!(cache_is_stale(true, Some(synced), now));
    }

    #[test]
    fn fresh_just_inside_the_window() {
        let now = Utc::now();
        let synced = now - Duration::seconds(3599);
        assert!(!cache_is_stale(true, Some(synced), now));
    }

    #[test]
    fn stale_when_never_synced_regardless_of_cache() {
        let now = Utc::now();
        assert!(cache_is_stale(true, None, now));
    }

    #[test]
    fn stale_when_no_cached_record_even_if_recently_synced() {
        let now = Utc::now();
        assert!(cache_is_stale(false, Some(now), now));
    }
}
