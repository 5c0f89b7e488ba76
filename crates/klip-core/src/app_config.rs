use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide configuration, parsed once at startup and passed by
/// reference into every component. Provider code never reads the
/// environment directly.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    /// Timeout applied to every outbound analytics/OAuth/profile request.
    pub provider_request_timeout_secs: u64,
    /// Additional attempts after the first, for transient failures only.
    pub provider_max_retries: u32,
    pub provider_retry_backoff_ms: u64,

    pub youtube_api_key: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub tiktok_client_key: Option<String>,
    pub tiktok_client_secret: Option<String>,
    pub instagram_app_id: Option<String>,
    pub instagram_app_secret: Option<String>,

    pub profile_api_key: Option<String>,
    pub profile_api_host: String,

    /// Frontend origin that hosts the OAuth callback page.
    pub oauth_redirect_origin: String,

    /// Enables the demo-handle canned records and the `_demo` bio-verify
    /// bypass. Off by default so production can never serve fabricated data.
    pub demo_mode: bool,
    /// Enables the randomized stub provider for the OTHER platform. Off by
    /// default: without it, OTHER resolves to the zero-valued manual
    /// provider.
    pub stub_metrics: bool,
}

impl AppConfig {
    /// Redirect URI registered with each OAuth provider.
    #[must_use]
    pub fn oauth_redirect_uri(&self) -> String {
        format!(
            "{}/integrations/callback",
            self.oauth_redirect_origin.trim_end_matches('/')
        )
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "provider_request_timeout_secs",
                &self.provider_request_timeout_secs,
            )
            .field("provider_max_retries", &self.provider_max_retries)
            .field("provider_retry_backoff_ms", &self.provider_retry_backoff_ms)
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("google_client_id", &redact(&self.google_client_id))
            .field("google_client_secret", &redact(&self.google_client_secret))
            .field("tiktok_client_key", &redact(&self.tiktok_client_key))
            .field("tiktok_client_secret", &redact(&self.tiktok_client_secret))
            .field("instagram_app_id", &redact(&self.instagram_app_id))
            .field("instagram_app_secret", &redact(&self.instagram_app_secret))
            .field("profile_api_key", &redact(&self.profile_api_key))
            .field("profile_api_host", &self.profile_api_host)
            .field("oauth_redirect_origin", &self.oauth_redirect_origin)
            .field("demo_mode", &self.demo_mode)
            .field("stub_metrics", &self.stub_metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://secret@localhost/klip".to_string(),
            env: Environment::Test,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            log_level: "info".to_string(),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            provider_request_timeout_secs: 30,
            provider_max_retries: 2,
            provider_retry_backoff_ms: 500,
            youtube_api_key: Some("yt-key".to_string()),
            google_client_id: None,
            google_client_secret: None,
            tiktok_client_key: None,
            tiktok_client_secret: None,
            instagram_app_id: None,
            instagram_app_secret: None,
            profile_api_key: Some("profile-key".to_string()),
            profile_api_host: "profile.example.com".to_string(),
            oauth_redirect_origin: "https://app.example.com/".to_string(),
            demo_mode: false,
            stub_metrics: false,
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("yt-key"));
        assert!(!rendered.contains("profile-key"));
        assert!(!rendered.contains("postgres://secret"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn redirect_uri_strips_trailing_slash() {
        assert_eq!(
            config().oauth_redirect_uri(),
            "https://app.example.com/integrations/callback"
        );
    }
}
