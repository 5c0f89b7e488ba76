//! Profile-biography lookup for bio-based account verification.
//!
//! Thin client for the third-party profile-scraper API: given a platform
//! username, return the public biography text so the caller can check for
//! the account's verification code.

use reqwest::{Client, Url};

use crate::error::ProviderError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Client for the profile-scraper API.
pub struct ProfileClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    host: String,
    retry: RetryPolicy,
}

impl ProfileClient {
    /// Creates a client pointed at the configured scraper host.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ProviderError::InvalidBaseUrl`] if `host`
    /// does not form a valid URL.
    pub fn new(
        api_key: Option<String>,
        host: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, host, timeout_secs, retry, &format!("https://{host}/"))
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// As [`ProfileClient::new`].
    pub fn with_base_url(
        api_key: Option<String>,
        host: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent("klip/0.1 (campaign-analytics)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
            url: normalised.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            host: host.to_owned(),
            retry,
        })
    }

    /// Fetches the public biography text for a username.
    ///
    /// A profile without a biography returns the empty string.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::MissingCredential`] when no API key is configured
    ///   (deployment defect, surfaced hard).
    /// - [`ProviderError::ProfileLookup`] when the scraper answers non-2xx,
    ///   carrying the status and a body excerpt for diagnosis.
    /// - [`ProviderError::Http`] / [`ProviderError::Deserialize`] on network
    ///   or payload failure.
    pub async fn fetch_biography(&self, username: &str) -> Result<String, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::MissingCredential {
                platform: "PROFILE",
                credential: "PROFILE_API_KEY",
            });
        };

        let mut url = self.base_url.join("ig/info_username/").map_err(|e| {
            ProviderError::InvalidBaseUrl {
                url: "ig/info_username/".to_owned(),
                reason: e.to_string(),
            }
        })?;
        url.query_pairs_mut().append_pair("user", username);

        let body = retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header("X-RapidAPI-Key", api_key)
                    .header("X-RapidAPI-Host", &self.host)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let detail = response.text().await.unwrap_or_default();
                    return Err(ProviderError::ProfileLookup {
                        status: status.as_u16(),
                        detail: excerpt(&detail),
                    });
                }
                let body = response.text().await?;
                serde_json::from_str::<serde_json::Value>(&body).map_err(|e| {
                    ProviderError::Deserialize {
                        context: url.path().to_owned(),
                        source: e,
                    }
                })
            }
        })
        .await?;

        Ok(body
            .get("user")
            .and_then(|u| u.get("biography"))
            .and_then(|b| b.as_str())
            .unwrap_or_default()
            .to_owned())
    }
}

/// Bound error bodies so a huge HTML error page doesn't flood the logs.
fn excerpt(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        body.to_owned()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}…", &body[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_fails_fast() {
        let client =
            ProfileClient::new(None, "profile.example.com", 5, RetryPolicy::default()).unwrap();
        let err = client.fetch_biography("someone").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredential {
                credential: "PROFILE_API_KEY",
                ..
            }
        ));
    }

    #[test]
    fn excerpt_bounds_long_bodies() {
        let long = "x".repeat(1000);
        let cut = excerpt(&long);
        assert!(cut.len() < 320);
        assert!(cut.ends_with('…'));
        assert_eq!(excerpt("short"), "short");
    }
}
