//! Canned records for the demo allow-list.
//!
//! Investor-demo scaffolding: a finite set of hardcoded handles resolves to
//! fixed metric data so the dashboard renders without live credentials. The
//! whole module is only consulted when `demo_mode` is enabled in config;
//! production builds with the flag off can never serve these numbers.

use klip_core::MetricRecord;

use crate::youtube::ContentMetricRecord;

/// Handles allowed to serve canned data. Deliberately finite and explicit —
/// this is not a general-purpose fallback.
pub const DEMO_HANDLES: &[&str] = &["@SchoolbyGanesh", "@TharunSpeaks"];

/// Whether a handle is on the demo allow-list.
#[must_use]
pub fn is_allowlisted(handle: &str) -> bool {
    DEMO_HANDLES.contains(&handle)
}

/// Fixed channel-level record for an allow-listed handle.
#[must_use]
pub fn canned_channel_record(handle: &str) -> Option<MetricRecord> {
    let record = match handle {
        "@SchoolbyGanesh" => MetricRecord {
            views: 4_812_330,
            likes: 0,
            comments: 0,
            shares: 0,
            extra: serde_json::Map::new(),
        }
        .with_extra("subscribers", 38_400_u64)
        .with_extra("video_count", 214_u64)
        .with_extra("title", "School by Ganesh"),
        "@TharunSpeaks" => MetricRecord {
            views: 1_905_114,
            likes: 0,
            comments: 0,
            shares: 0,
            extra: serde_json::Map::new(),
        }
        .with_extra("subscribers", 12_700_u64)
        .with_extra("video_count", 88_u64)
        .with_extra("title", "Tharun Speaks"),
        _ => return None,
    };
    Some(record)
}

/// Fixed per-upload breakdown for an allow-listed handle.
#[must_use]
pub fn canned_content_list(handle: &str) -> Option<Vec<ContentMetricRecord>> {
    if !is_allowlisted(handle) {
        return None;
    }
    Some(vec![
        ContentMetricRecord {
            id: "demo-upload-1".to_owned(),
            title: format!("{} — exam week study plan", handle.trim_start_matches('@')),
            thumbnail: None,
            published_at: None,
            views: 182_413,
            likes: 9_120,
            comments: 431,
            duration: Some("PT42S".to_owned()),
            is_short: true,
        },
        ContentMetricRecord {
            id: "demo-upload-2".to_owned(),
            title: format!("{} — full syllabus breakdown", handle.trim_start_matches('@')),
            thumbnail: None,
            published_at: None,
            views: 96_882,
            likes: 4_305,
            comments: 212,
            duration: Some("PT12M8S".to_owned()),
            is_short: false,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_is_exact_match_only() {
        assert!(is_allowlisted("@SchoolbyGanesh"));
        assert!(!is_allowlisted("@schoolbyganesh"));
        assert!(!is_allowlisted("@SomeoneElse"));
    }

    #[test]
    fn canned_record_exists_for_every_allowlisted_handle() {
        for handle in DEMO_HANDLES {
            assert!(canned_channel_record(handle).is_some());
            assert!(canned_content_list(handle).is_some());
        }
    }

    #[test]
    fn unlisted_handle_gets_nothing() {
        assert!(canned_channel_record("@creator").is_none());
        assert!(canned_content_list("@creator").is_none());
    }
}
