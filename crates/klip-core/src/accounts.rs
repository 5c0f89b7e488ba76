//! Connected-account helpers: verification codes, handle normalization,
//! and profile-URL parsing.

use rand::Rng;

use crate::platform::Platform;

const CODE_LEN: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Suffix that triggers the demo verification bypass (only honoured when
/// demo mode is enabled in config).
const DEMO_HANDLE_SUFFIX: &str = "_demo";

/// Generate a 6-character uppercase-alphanumeric verification code.
///
/// The account owner places this code in their public profile biography to
/// prove ownership of the handle.
#[must_use]
pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect()
}

/// Normalize a user-supplied handle for storage.
///
/// Trims whitespace; YouTube handles are stored with a leading `@`.
#[must_use]
pub fn normalize_handle(platform: Platform, raw: &str) -> String {
    let trimmed = raw.trim();
    if platform == Platform::Youtube && !trimmed.starts_with('@') {
        format!("@{trimmed}")
    } else {
        trimmed.to_owned()
    }
}

/// Whether a handle opts into the demo verification bypass.
#[must_use]
pub fn is_demo_handle(handle: &str) -> bool {
    handle.ends_with(DEMO_HANDLE_SUFFIX)
}

/// Extract the platform username from a public profile URL.
///
/// The username is the last path segment, with any trailing slash and query
/// string stripped: `https://instagram.com/some_user/?hl=en` -> `some_user`.
#[must_use]
pub fn username_from_profile_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let without_query = last.split('?').next().unwrap_or(last);
    without_query.to_owned()
}

/// Default profile URL for accounts linked by handle, without OAuth.
#[must_use]
pub fn default_profile_url(platform: Platform, handle: &str) -> String {
    match platform {
        Platform::Youtube => format!("https://youtube.com/{handle}"),
        Platform::Tiktok => format!("https://tiktok.com/@{}", handle.trim_start_matches('@')),
        Platform::Instagram | Platform::Other => {
            format!("https://instagram.com/{}", handle.trim_start_matches('@'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_code_is_six_uppercase_alphanumerics() {
        for _ in 0..50 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn youtube_handles_get_an_at_prefix() {
        assert_eq!(normalize_handle(Platform::Youtube, "creator"), "@creator");
        assert_eq!(normalize_handle(Platform::Youtube, "@creator"), "@creator");
        assert_eq!(normalize_handle(Platform::Youtube, "  creator "), "@creator");
    }

    #[test]
    fn other_platforms_only_trim() {
        assert_eq!(normalize_handle(Platform::Tiktok, " someone "), "someone");
        assert_eq!(normalize_handle(Platform::Instagram, "someone"), "someone");
    }

    #[test]
    fn demo_suffix_detection() {
        assert!(is_demo_handle("@creator_demo"));
        assert!(is_demo_handle("creator_demo"));
        assert!(!is_demo_handle("@creator"));
    }

    #[test]
    fn username_extraction_handles_slash_and_query() {
        assert_eq!(
            username_from_profile_url("https://instagram.com/some_user/"),
            "some_user"
        );
        assert_eq!(
            username_from_profile_url("https://instagram.com/some_user?hl=en"),
            "some_user"
        );
        assert_eq!(
            username_from_profile_url("https://instagram.com/some_user/?hl=en"),
            "some_user"
        );
    }
}
