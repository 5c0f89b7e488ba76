//! `YouTube` Data API client.
//!
//! Wraps `reqwest` with typed response deserialization, explicit timeouts,
//! and bounded retries. Metric fetches authenticate with the account's OAuth
//! bearer token when one is present, falling back to the developer API key;
//! with neither, the fetch degrades to a zero-valued record rather than
//! failing the caller.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use klip_core::MetricRecord;

use crate::demo;
use crate::error::ProviderError;
use crate::retry::{retry_with_backoff, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

/// Per-video (or per-short) engagement breakdown for one channel upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetricRecord {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub duration: Option<String>,
    pub is_short: bool,
}

/// Channel identity fetched after an OAuth exchange, used to derive the
/// stored handle and profile URL.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub title: String,
    pub custom_url: Option<String>,
}

/// Client for the `YouTube` Data API v3.
///
/// Use [`YouTubeClient::new`] for production or
/// [`YouTubeClient::with_base_url`] to point at a mock server in tests.
pub struct YouTubeClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    retry: RetryPolicy,
    demo_mode: bool,
}

impl YouTubeClient {
    /// Creates a client pointed at the production Data API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: Option<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
        demo_mode: bool,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, timeout_secs, retry, demo_mode, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the client cannot be constructed,
    /// or [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
        demo_mode: bool,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent("klip/0.1 (campaign-analytics)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
                url: normalised.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            retry,
            demo_mode,
        })
    }

    /// Extracts a video ID from the URL shapes the platform serves.
    ///
    /// Handles `watch?v={id}`, `/shorts/{id}`, and `youtu.be/{id}`. Returns
    /// `None` for channel URLs and bare handles, which route to
    /// channel-level statistics instead.
    #[must_use]
    pub fn video_id_from_url(reference: &str) -> Option<String> {
        let parsed = Url::parse(reference).ok()?;
        let host = parsed.host_str()?;

        if host == "www.youtube.com" || host == "youtube.com" {
            if parsed.path() == "/watch" {
                return parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())
                    .filter(|v| !v.is_empty());
            }
            if let Some(rest) = parsed.path().strip_prefix("/shorts/") {
                let id = rest.split('/').next().unwrap_or("");
                return (!id.is_empty()).then(|| id.to_owned());
            }
        }
        if host == "youtu.be" {
            let id = parsed.path().trim_start_matches('/');
            let id = id.split('/').next().unwrap_or("");
            return (!id.is_empty()).then(|| id.to_owned());
        }
        None
    }

    /// Fetches a normalized metric record for a video URL or channel handle.
    ///
    /// Never fails: any external-API error is logged and converted to the
    /// zero record so callers can always rely on a well-formed result.
    pub async fn fetch_analytics(
        &self,
        reference: &str,
        access_token: Option<&str>,
    ) -> MetricRecord {
        if self.demo_mode {
            if let Some(record) = demo::canned_channel_record(reference) {
                tracing::info!(reference, "serving canned demo channel record");
                return record;
            }
        }

        let result = match Self::video_id_from_url(reference) {
            Some(video_id) => self.video_record(&video_id, access_token).await,
            None => self.channel_record(reference, access_token).await,
        };

        match result {
            Ok(record) => record,
            Err(ProviderError::MissingCredential { credential, .. }) => {
                tracing::warn!(
                    platform = "YOUTUBE",
                    reference,
                    credential,
                    "no credential available; returning zero metrics"
                );
                MetricRecord::zero()
            }
            Err(e) => {
                tracing::warn!(
                    platform = "YOUTUBE",
                    reference,
                    error = %e,
                    "analytics fetch failed; returning zero metrics"
                );
                MetricRecord::zero()
            }
        }
    }

    /// Fetches per-upload metric records for a channel, newest first.
    ///
    /// Resolves the channel (by OAuth token, or by handle with the API key),
    /// walks its uploads playlist, and fetches statistics for each video.
    /// With demo mode on, allow-listed handles return a canned list without
    /// any network call.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::MissingCredential`] without a token or API key.
    /// - [`ProviderError::Http`] / [`ProviderError::UnexpectedStatus`] on
    ///   network or API failure.
    /// - [`ProviderError::Deserialize`] if a response does not match the
    ///   expected shape.
    pub async fn fetch_content_analytics(
        &self,
        access_token: Option<&str>,
        handle: &str,
        max_results: usize,
    ) -> Result<Vec<ContentMetricRecord>, ProviderError> {
        if self.demo_mode {
            if let Some(list) = demo::canned_content_list(handle) {
                tracing::info!(handle, "serving canned demo content list");
                return Ok(list);
            }
        }

        let Some(channel) = self.channel_item(handle, access_token).await? else {
            return Ok(Vec::new());
        };
        let Some(uploads) = channel
            .content_details
            .and_then(|d| d.related_playlists)
            .and_then(|p| p.uploads)
        else {
            return Ok(Vec::new());
        };

        let video_ids = self
            .playlist_video_ids(&uploads, access_token, max_results.min(50))
            .await?;
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.video_details(&video_ids, access_token).await
    }

    /// Fetches the authenticated user's channel identity (`mine=true`).
    ///
    /// Used once after an OAuth exchange to derive the handle and profile
    /// URL for the connected account.
    ///
    /// # Errors
    ///
    /// Fails as [`fetch_content_analytics`](Self::fetch_content_analytics);
    /// additionally returns [`ProviderError::UnexpectedStatus`] with status
    /// 404 semantics folded into `Ok(None)` when no channel exists.
    pub async fn channel_info(&self, access_token: &str) -> Result<Option<ChannelInfo>, ProviderError> {
        let Some(item) = self.channel_item_mine(access_token).await? else {
            return Ok(None);
        };
        let Some(id) = item.id else { return Ok(None) };
        let snippet = item.snippet.unwrap_or_default();
        Ok(Some(ChannelInfo {
            channel_id: id,
            title: snippet.title.unwrap_or_default(),
            custom_url: snippet.custom_url,
        }))
    }

    // -- internal ---------------------------------------------------------

    async fn video_record(
        &self,
        video_id: &str,
        access_token: Option<&str>,
    ) -> Result<MetricRecord, ProviderError> {
        let body = self
            .request(
                "videos",
                &[("part", "statistics"), ("id", video_id)],
                access_token,
            )
            .await?;
        let list: ListResponse<VideoItem> = decode(body, &format!("videos.list(id={video_id})"))?;

        let Some(item) = list.items.into_iter().next() else {
            return Ok(MetricRecord::zero());
        };
        let stats = item.statistics.unwrap_or_default();
        Ok(MetricRecord {
            views: parse_count(stats.view_count.as_deref()),
            likes: parse_count(stats.like_count.as_deref()),
            comments: parse_count(stats.comment_count.as_deref()),
            // The Data API does not expose share counts.
            shares: 0,
            extra: serde_json::Map::new(),
        })
    }

    async fn channel_record(
        &self,
        handle: &str,
        access_token: Option<&str>,
    ) -> Result<MetricRecord, ProviderError> {
        let Some(item) = self.channel_item(handle, access_token).await? else {
            return Ok(MetricRecord::zero());
        };
        let stats = item.statistics.unwrap_or_default();
        let snippet = item.snippet.unwrap_or_default();

        let mut record = MetricRecord {
            views: parse_count(stats.view_count.as_deref()),
            likes: 0,
            comments: 0,
            shares: 0,
            extra: serde_json::Map::new(),
        };
        record = record
            .with_extra("subscribers", parse_count(stats.subscriber_count.as_deref()))
            .with_extra("video_count", parse_count(stats.video_count.as_deref()));
        if let Some(title) = snippet.title {
            record = record.with_extra("title", title);
        }
        if let Some(thumb) = snippet.thumbnail_url() {
            record = record.with_extra("thumbnail", thumb);
        }
        Ok(record)
    }

    /// Resolves a channel item: `mine=true` with a token, `forHandle`
    /// with the developer key otherwise.
    async fn channel_item(
        &self,
        reference: &str,
        access_token: Option<&str>,
    ) -> Result<Option<ChannelItem>, ProviderError> {
        if let Some(token) = access_token {
            return self.channel_item_mine(token).await;
        }
        let handle = channel_handle(reference);
        let body = self
            .request(
                "channels",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("forHandle", &handle),
                ],
                None,
            )
            .await?;
        let list: ListResponse<ChannelItem> =
            decode(body, &format!("channels.list(forHandle={handle})"))?;
        Ok(list.items.into_iter().next())
    }

    async fn channel_item_mine(
        &self,
        access_token: &str,
    ) -> Result<Option<ChannelItem>, ProviderError> {
        let body = self
            .request(
                "channels",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("mine", "true"),
                ],
                Some(access_token),
            )
            .await?;
        let list: ListResponse<ChannelItem> = decode(body, "channels.list(mine=true)")?;
        Ok(list.items.into_iter().next())
    }

    async fn playlist_video_ids(
        &self,
        playlist_id: &str,
        access_token: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let max = max_results.to_string();
        let body = self
            .request(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", &max),
                ],
                access_token,
            )
            .await?;
        let list: ListResponse<PlaylistItem> =
            decode(body, &format!("playlistItems.list(playlistId={playlist_id})"))?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|i| i.content_details.and_then(|d| d.video_id))
            .collect())
    }

    async fn video_details(
        &self,
        video_ids: &[String],
        access_token: Option<&str>,
    ) -> Result<Vec<ContentMetricRecord>, ProviderError> {
        let joined = video_ids.join(",");
        let body = self
            .request(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", &joined),
                ],
                access_token,
            )
            .await?;
        let list: ListResponse<VideoItem> = decode(body, "videos.list(content details)")?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id?;
                let snippet = item.snippet.unwrap_or_default();
                let stats = item.statistics.unwrap_or_default();
                let duration = item.content_details.and_then(|d| d.duration);
                let title = snippet.title.clone().unwrap_or_default();
                let description = snippet.description.clone().unwrap_or_default();
                let is_short = classify_short(duration.as_deref(), &title, &description);
                Some(ContentMetricRecord {
                    id,
                    title,
                    thumbnail: snippet.thumbnail_url(),
                    published_at: snippet.published_at,
                    views: parse_count(stats.view_count.as_deref()),
                    likes: parse_count(stats.like_count.as_deref()),
                    comments: parse_count(stats.comment_count.as_deref()),
                    duration,
                    is_short,
                })
            })
            .collect())
    }

    /// Sends a GET request with retries, asserting a 2xx status.
    ///
    /// Authenticates with the bearer token when present, else appends the
    /// developer API key. With neither, fails fast with
    /// [`ProviderError::MissingCredential`] — no network cost.
    async fn request(
        &self,
        path: &str,
        params: &[(&str, &str)],
        access_token: Option<&str>,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut url = self.base_url.join(path).map_err(|e| {
            ProviderError::InvalidBaseUrl {
                url: path.to_owned(),
                reason: e.to_string(),
            }
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            if access_token.is_none() {
                match &self.api_key {
                    Some(key) => {
                        pairs.append_pair("key", key);
                    }
                    None => {
                        return Err(ProviderError::MissingCredential {
                            platform: "YOUTUBE",
                            credential: "YOUTUBE_API_KEY",
                        })
                    }
                }
            }
        }

        retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                let mut req = self.client.get(url.clone());
                if let Some(token) = access_token {
                    req = req.bearer_auth(token);
                }
                let response = req.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ProviderError::UnexpectedStatus {
                        status: status.as_u16(),
                        context: url.path().to_owned(),
                    });
                }
                let body = response.text().await?;
                serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
                    context: url.path().to_owned(),
                    source: e,
                })
            }
        })
        .await
    }
}

/// Shorts classification heuristic carried over from the dashboard: a video
/// counts as a short when its ISO-8601 duration has no whole minute (and no
/// hour), or when the title/description mentions "short". Known-imprecise
/// placeholder; there is no authoritative duration threshold.
#[must_use]
pub fn classify_short(duration: Option<&str>, title: &str, description: &str) -> bool {
    let under_a_minute = duration.is_some_and(|d| {
        let (hours, minutes, _) = duration_components(d);
        hours.is_none() && minutes.is_none_or(|m| m == 0)
    });
    under_a_minute
        || title.to_lowercase().contains("short")
        || description.to_lowercase().contains("short")
}

/// Splits an ISO-8601 duration (`PT1H2M3S` shapes) into hour/minute/second
/// components. Components that do not appear are `None`.
fn duration_components(iso: &str) -> (Option<u64>, Option<u64>, Option<u64>) {
    let Some(time_part) = iso.split('T').nth(1).or_else(|| iso.strip_prefix("PT")) else {
        return (None, None, None);
    };
    let mut hours = None;
    let mut minutes = None;
    let mut seconds = None;
    let mut digits = String::new();
    for c in time_part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value = digits.parse::<u64>().ok();
        digits.clear();
        match c {
            'H' => hours = value,
            'M' => minutes = value,
            'S' => seconds = value,
            _ => {}
        }
    }
    (hours, minutes, seconds)
}

/// Reduces a channel reference to the bare handle `forHandle` expects:
/// `https://www.youtube.com/@creator?tab=videos` -> `@creator`. References
/// that are already bare handles pass through unchanged.
fn channel_handle(reference: &str) -> String {
    if let Some(idx) = reference.find("/@") {
        let rest = &reference[idx + 1..];
        let handle = rest.split(['/', '?']).next().unwrap_or(rest);
        return handle.to_owned();
    }
    reference.to_owned()
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn decode<T: serde::de::DeserializeOwned>(
    body: serde_json::Value,
    context: &str,
) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

// -- wire shapes ----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: Option<String>,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: Option<String>,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "customUrl")]
    custom_url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    thumbnails: Option<Thumbnails>,
}

impl Snippet {
    fn thumbnail_url(&self) -> Option<String> {
        self.thumbnails
            .as_ref()
            .and_then(|t| t.default.as_ref().or(t.medium.as_ref()))
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
    #[serde(rename = "commentCount")]
    comment_count: Option<String>,
    #[serde(rename = "subscriberCount")]
    subscriber_count: Option<String>,
    #[serde(rename = "videoCount")]
    video_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}
