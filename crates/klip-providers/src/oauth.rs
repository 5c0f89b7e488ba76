//! OAuth authorize-URL building and code-for-token exchange.
//!
//! One client covers the three platform token endpoints. Missing client
//! credentials are configuration errors surfaced to the caller; a rejection
//! from the platform's token endpoint is a user-facing exchange failure
//! carrying the platform's own error payload.

use reqwest::{Client, Url};
use uuid::Uuid;

use klip_core::Platform;

use crate::error::ProviderError;
use crate::retry::{retry_with_backoff, RetryPolicy};

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const TIKTOK_AUTHORIZE_URL: &str = "https://www.tiktok.com/v2/auth/authorize/";
const TIKTOK_TOKEN_URL: &str = "https://open.tiktokapis.com/v2/oauth/token/";
const INSTAGRAM_AUTHORIZE_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";
const INSTAGRAM_TOKEN_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";

const YOUTUBE_SCOPES: &str =
    "https://www.googleapis.com/auth/youtube.readonly https://www.googleapis.com/auth/userinfo.profile";
const TIKTOK_SCOPES: &str = "user.info.basic,video.list";
const INSTAGRAM_SCOPES: &str = "instagram_manage_insights,pages_show_list,pages_read_engagement";

/// Per-platform client credentials, all optional: a platform without
/// configured credentials simply cannot be connected, and says so.
#[derive(Debug, Clone, Default)]
pub struct OAuthCredentials {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub tiktok_client_key: Option<String>,
    pub tiktok_client_secret: Option<String>,
    pub instagram_app_id: Option<String>,
    pub instagram_app_secret: Option<String>,
}

/// Authorize URL plus the anti-forgery state embedded in it. The frontend
/// round-trips the state through the platform redirect.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub url: String,
    pub state: String,
}

/// Result of a successful code exchange.
///
/// `expires_in` is the platform-reported lifetime in seconds; callers
/// record `now + expires_in` and treat an expired token as absent — there
/// is no proactive refresh.
#[derive(Debug, Clone)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    /// TikTok's user identifier, used as a placeholder handle until the
    /// real one can be fetched.
    pub open_id: Option<String>,
}

/// Client for the platform OAuth token endpoints.
pub struct OAuthClient {
    client: Client,
    creds: OAuthCredentials,
    redirect_uri: String,
    retry: RetryPolicy,
    google_token_url: Url,
    tiktok_token_url: Url,
    instagram_token_url: Url,
}

impl OAuthClient {
    /// Creates a client pointed at the production token endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        creds: OAuthCredentials,
        redirect_uri: String,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        Self::with_token_endpoints(
            creds,
            redirect_uri,
            timeout_secs,
            retry,
            GOOGLE_TOKEN_URL,
            TIKTOK_TOKEN_URL,
            INSTAGRAM_TOKEN_URL,
        )
    }

    /// Creates a client with custom token endpoints (for wiremock tests).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the client cannot be constructed,
    /// or [`ProviderError::InvalidBaseUrl`] for an unparsable endpoint.
    #[allow(clippy::too_many_arguments)]
    pub fn with_token_endpoints(
        creds: OAuthCredentials,
        redirect_uri: String,
        timeout_secs: u64,
        retry: RetryPolicy,
        google_token_url: &str,
        tiktok_token_url: &str,
        instagram_token_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent("klip/0.1 (campaign-analytics)")
            .build()?;

        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| ProviderError::InvalidBaseUrl {
                url: raw.to_owned(),
                reason: e.to_string(),
            })
        };

        Ok(Self {
            client,
            creds,
            redirect_uri,
            retry,
            google_token_url: parse(google_token_url)?,
            tiktok_token_url: parse(tiktok_token_url)?,
            instagram_token_url: parse(instagram_token_url)?,
        })
    }

    /// Builds the authorize URL the frontend opens for a platform.
    ///
    /// # Errors
    ///
    /// [`ProviderError::MissingCredential`] when the platform's client id is
    /// not configured, [`ProviderError::Unsupported`] for platforms without
    /// an OAuth flow.
    pub fn authorize_url(&self, platform: Platform) -> Result<AuthorizeRequest, ProviderError> {
        let state = Uuid::new_v4().to_string();
        let url = match platform {
            Platform::Youtube => {
                let client_id = self.creds.google_client_id.as_deref().ok_or(
                    ProviderError::MissingCredential {
                        platform: "YOUTUBE",
                        credential: "GOOGLE_CLIENT_ID",
                    },
                )?;
                build_url(
                    GOOGLE_AUTHORIZE_URL,
                    &[
                        ("client_id", client_id),
                        ("redirect_uri", &self.redirect_uri),
                        ("response_type", "code"),
                        ("scope", YOUTUBE_SCOPES),
                        ("state", &state),
                        ("access_type", "offline"),
                        ("prompt", "consent"),
                    ],
                )?
            }
            Platform::Tiktok => {
                let client_key = self.creds.tiktok_client_key.as_deref().ok_or(
                    ProviderError::MissingCredential {
                        platform: "TIKTOK",
                        credential: "TIKTOK_CLIENT_KEY",
                    },
                )?;
                build_url(
                    TIKTOK_AUTHORIZE_URL,
                    &[
                        ("client_key", client_key),
                        ("scope", TIKTOK_SCOPES),
                        ("response_type", "code"),
                        ("redirect_uri", &self.redirect_uri),
                        ("state", &state),
                    ],
                )?
            }
            Platform::Instagram => {
                let app_id = self.creds.instagram_app_id.as_deref().ok_or(
                    ProviderError::MissingCredential {
                        platform: "INSTAGRAM",
                        credential: "INSTAGRAM_APP_ID",
                    },
                )?;
                build_url(
                    INSTAGRAM_AUTHORIZE_URL,
                    &[
                        ("client_id", app_id),
                        ("redirect_uri", &self.redirect_uri),
                        ("scope", INSTAGRAM_SCOPES),
                        ("response_type", "code"),
                        ("state", &state),
                    ],
                )?
            }
            Platform::Other => {
                return Err(ProviderError::Unsupported {
                    platform: platform.to_string(),
                    operation: "OAuth connect",
                })
            }
        };
        Ok(AuthorizeRequest { url, state })
    }

    /// Exchanges an authorization code for tokens at the platform's token
    /// endpoint.
    ///
    /// # Errors
    ///
    /// [`ProviderError::MissingCredential`] when client credentials are not
    /// configured, [`ProviderError::TokenExchange`] when the endpoint
    /// rejects the code, [`ProviderError::Http`] on network failure.
    pub async fn exchange_code(
        &self,
        platform: Platform,
        code: &str,
    ) -> Result<OAuthTokens, ProviderError> {
        match platform {
            Platform::Youtube => {
                let (id, secret) = self.google_credentials()?;
                let form = [
                    ("client_id", id),
                    ("client_secret", secret),
                    ("code", code),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", &self.redirect_uri),
                ];
                let body = self.post_form(&self.google_token_url, &form).await?;
                parse_tokens("YOUTUBE", &body)
            }
            Platform::Tiktok => {
                let (key, secret) = self.tiktok_credentials()?;
                let form = [
                    ("client_key", key),
                    ("client_secret", secret),
                    ("code", code),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", &self.redirect_uri),
                ];
                let body = self.post_form(&self.tiktok_token_url, &form).await?;
                parse_tokens("TIKTOK", &body)
            }
            Platform::Instagram => {
                let (id, secret) = self.instagram_credentials()?;
                let mut url = self.instagram_token_url.clone();
                url.query_pairs_mut()
                    .append_pair("client_id", id)
                    .append_pair("client_secret", secret)
                    .append_pair("redirect_uri", &self.redirect_uri)
                    .append_pair("code", code);
                let body = self.get_json(&url).await?;
                parse_tokens("INSTAGRAM", &body)
            }
            Platform::Other => Err(ProviderError::Unsupported {
                platform: platform.to_string(),
                operation: "OAuth exchange",
            }),
        }
    }

    fn google_credentials(&self) -> Result<(&str, &str), ProviderError> {
        match (
            self.creds.google_client_id.as_deref(),
            self.creds.google_client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            (None, _) => Err(ProviderError::MissingCredential {
                platform: "YOUTUBE",
                credential: "GOOGLE_CLIENT_ID",
            }),
            (_, None) => Err(ProviderError::MissingCredential {
                platform: "YOUTUBE",
                credential: "GOOGLE_CLIENT_SECRET",
            }),
        }
    }

    fn tiktok_credentials(&self) -> Result<(&str, &str), ProviderError> {
        match (
            self.creds.tiktok_client_key.as_deref(),
            self.creds.tiktok_client_secret.as_deref(),
        ) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            (None, _) => Err(ProviderError::MissingCredential {
                platform: "TIKTOK",
                credential: "TIKTOK_CLIENT_KEY",
            }),
            (_, None) => Err(ProviderError::MissingCredential {
                platform: "TIKTOK",
                credential: "TIKTOK_CLIENT_SECRET",
            }),
        }
    }

    fn instagram_credentials(&self) -> Result<(&str, &str), ProviderError> {
        match (
            self.creds.instagram_app_id.as_deref(),
            self.creds.instagram_app_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            (None, _) => Err(ProviderError::MissingCredential {
                platform: "INSTAGRAM",
                credential: "INSTAGRAM_APP_ID",
            }),
            (_, None) => Err(ProviderError::MissingCredential {
                platform: "INSTAGRAM",
                credential: "INSTAGRAM_APP_SECRET",
            }),
        }
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, ProviderError> {
        retry_with_backoff(self.retry, || async move {
            let response = self.client.post(url.clone()).form(form).send().await?;
            read_json(url, response).await
        })
        .await
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, ProviderError> {
        retry_with_backoff(self.retry, || async move {
            let response = self.client.get(url.clone()).send().await?;
            read_json(url, response).await
        })
        .await
    }
}

/// Token endpoints answer 4xx with a JSON error body the user needs to see;
/// only 5xx is treated as transient.
async fn read_json(url: &Url, response: reqwest::Response) -> Result<serde_json::Value, ProviderError> {
    let status = response.status();
    if status.is_server_error() {
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

fn parse_tokens(platform: &str, body: &serde_json::Value) -> Result<OAuthTokens, ProviderError> {
    let Some(access_token) = body.get("access_token").and_then(|v| v.as_str()) else {
        return Err(ProviderError::TokenExchange {
            platform: platform.to_owned(),
            detail: body.to_string(),
        });
    };
    Ok(OAuthTokens {
        access_token: access_token.to_owned(),
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned),
        expires_in: body.get("expires_in").and_then(serde_json::Value::as_i64),
        open_id: body
            .get("open_id")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned),
    })
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<String, ProviderError> {
    let mut url = Url::parse(base).map_err(|e| ProviderError::InvalidBaseUrl {
        url: base.to_owned(),
        reason: e.to_string(),
    })?;
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k, v);
        }
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> OAuthCredentials {
        OAuthCredentials {
            google_client_id: Some("google-id".to_owned()),
            google_client_secret: Some("google-secret".to_owned()),
            tiktok_client_key: Some("tiktok-key".to_owned()),
            tiktok_client_secret: Some("tiktok-secret".to_owned()),
            instagram_app_id: Some("ig-id".to_owned()),
            instagram_app_secret: Some("ig-secret".to_owned()),
        }
    }

    fn client(creds: OAuthCredentials) -> OAuthClient {
        OAuthClient::new(
            creds,
            "https://app.example.com/integrations/callback".to_owned(),
            5,
            RetryPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn youtube_authorize_url_carries_offline_access() {
        let request = client(creds()).authorize_url(Platform::Youtube).unwrap();
        assert!(request.url.starts_with(GOOGLE_AUTHORIZE_URL));
        assert!(request.url.contains("client_id=google-id"));
        assert!(request.url.contains("access_type=offline"));
        assert!(request.url.contains(&format!("state={}", request.state)));
    }

    #[test]
    fn tiktok_authorize_url_uses_client_key() {
        let request = client(creds()).authorize_url(Platform::Tiktok).unwrap();
        assert!(request.url.contains("client_key=tiktok-key"));
        assert!(request.url.contains("scope=user.info.basic%2Cvideo.list"));
    }

    #[test]
    fn missing_client_id_is_a_config_error() {
        let err = client(OAuthCredentials::default())
            .authorize_url(Platform::Youtube)
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredential {
                credential: "GOOGLE_CLIENT_ID",
                ..
            }
        ));
    }

    #[test]
    fn other_platform_has_no_oauth_flow() {
        let err = client(creds()).authorize_url(Platform::Other).unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));
    }

    #[test]
    fn token_payload_without_access_token_is_an_exchange_failure() {
        let body = serde_json::json!({ "error": "invalid_grant" });
        let err = parse_tokens("YOUTUBE", &body).unwrap_err();
        match err {
            ProviderError::TokenExchange { platform, detail } => {
                assert_eq!(platform, "YOUTUBE");
                assert!(detail.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn token_payload_parses_optional_fields() {
        let body = serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 86400,
            "open_id": "user-123"
        });
        let tokens = parse_tokens("TIKTOK", &body).unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.expires_in, Some(86400));
        assert_eq!(tokens.open_id.as_deref(), Some("user-123"));
    }
}
