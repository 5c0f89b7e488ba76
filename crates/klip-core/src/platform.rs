//! Closed platform and status enums shared across the workspace.
//!
//! All enums round-trip through their SCREAMING_CASE wire strings. Parsing an
//! unknown string is an error — there is no catch-all default, so a platform
//! without a real integration can never be resolved by accident.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parse failure for any of the closed enums in this module.
#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Social platform a connected account or submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Other,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Youtube => "YOUTUBE",
            Platform::Tiktok => "TIKTOK",
            Platform::Instagram => "INSTAGRAM",
            Platform::Other => "OTHER",
        }
    }

    /// Platforms whose metric fetches are gated on a user OAuth token.
    #[must_use]
    pub fn requires_access_token(self) -> bool {
        matches!(self, Platform::Tiktok | Platform::Instagram)
    }

    /// Platforms where ownership can be checked by a handle-in-URL match.
    ///
    /// Instagram reel and YouTube short URLs do not carry the author handle,
    /// so those platforms are trusted once the account is verified.
    #[must_use]
    pub fn supports_url_ownership_check(self) -> bool {
        matches!(self, Platform::Tiktok | Platform::Other)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YOUTUBE" => Ok(Platform::Youtube),
            "TIKTOK" => Ok(Platform::Tiktok),
            "INSTAGRAM" => Ok(Platform::Instagram),
            "OTHER" => Ok(Platform::Other),
            other => Err(UnknownVariant {
                kind: "platform",
                value: other.to_owned(),
            }),
        }
    }
}

/// Verification state of a connected account.
///
/// Lifecycle: `Pending -> {Verified, Rejected}`. There is no path back to
/// `Pending`; only an administrator can move an account out of `Verified`
/// or `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Pending,
    Verified,
    Rejected,
}

impl AccountStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Pending => "PENDING",
            AccountStatus::Verified => "VERIFIED",
            AccountStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AccountStatus::Pending),
            "VERIFIED" => Ok(AccountStatus::Verified),
            "REJECTED" => Ok(AccountStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "account status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Active,
    Pending,
    Approved,
    Rejected,
    Removed,
}

impl SubmissionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Active => "ACTIVE",
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Approved => "APPROVED",
            SubmissionStatus::Rejected => "REJECTED",
            SubmissionStatus::Removed => "REMOVED",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SubmissionStatus::Active),
            "PENDING" => Ok(SubmissionStatus::Pending),
            "APPROVED" => Ok(SubmissionStatus::Approved),
            "REJECTED" => Ok(SubmissionStatus::Rejected),
            "REMOVED" => Ok(SubmissionStatus::Removed),
            other => Err(UnknownVariant {
                kind: "submission status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Membership state of a user within a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

impl MembershipStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipStatus::Pending => "PENDING",
            MembershipStatus::Approved => "APPROVED",
            MembershipStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(MembershipStatus::Pending),
            "APPROVED" => Ok(MembershipStatus::Approved),
            "REJECTED" => Ok(MembershipStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "membership status",
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn platform_round_trips_wire_strings() {
        for platform in [
            Platform::Youtube,
            Platform::Tiktok,
            Platform::Instagram,
            Platform::Other,
        ] {
            assert_eq!(Platform::from_str(platform.as_str()).unwrap(), platform);
        }
    }

    #[test]
    fn unknown_platform_is_an_error_not_a_default() {
        let err = Platform::from_str("TWITCH").unwrap_err();
        assert_eq!(err.value, "TWITCH");
    }

    #[test]
    fn platform_serde_uses_screaming_case() {
        let json = serde_json::to_string(&Platform::Youtube).unwrap();
        assert_eq!(json, "\"YOUTUBE\"");
        let back: Platform = serde_json::from_str("\"TIKTOK\"").unwrap();
        assert_eq!(back, Platform::Tiktok);
    }

    #[test]
    fn token_gated_platforms() {
        assert!(Platform::Tiktok.requires_access_token());
        assert!(Platform::Instagram.requires_access_token());
        assert!(!Platform::Youtube.requires_access_token());
    }

    #[test]
    fn url_ownership_check_platforms() {
        assert!(Platform::Tiktok.supports_url_ownership_check());
        assert!(Platform::Other.supports_url_ownership_check());
        assert!(!Platform::Youtube.supports_url_ownership_check());
        assert!(!Platform::Instagram.supports_url_ownership_check());
    }

    #[test]
    fn account_status_round_trips() {
        for status in [
            AccountStatus::Pending,
            AccountStatus::Verified,
            AccountStatus::Rejected,
        ] {
            assert_eq!(AccountStatus::from_str(status.as_str()).unwrap(), status);
        }
    }
}
