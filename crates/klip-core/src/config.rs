use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("KLIP_ENV", "development"));
    let bind_addr = parse_addr("KLIP_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("KLIP_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("KLIP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("KLIP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("KLIP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let provider_request_timeout_secs = parse_u64("KLIP_PROVIDER_REQUEST_TIMEOUT_SECS", "30")?;
    let provider_max_retries = parse_u32("KLIP_PROVIDER_MAX_RETRIES", "2")?;
    let provider_retry_backoff_ms = parse_u64("KLIP_PROVIDER_RETRY_BACKOFF_MS", "500")?;

    let optional = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        provider_request_timeout_secs,
        provider_max_retries,
        provider_retry_backoff_ms,
        youtube_api_key: optional("YOUTUBE_API_KEY"),
        google_client_id: optional("GOOGLE_CLIENT_ID"),
        google_client_secret: optional("GOOGLE_CLIENT_SECRET"),
        tiktok_client_key: optional("TIKTOK_CLIENT_KEY"),
        tiktok_client_secret: optional("TIKTOK_CLIENT_SECRET"),
        instagram_app_id: optional("INSTAGRAM_APP_ID"),
        instagram_app_secret: optional("INSTAGRAM_APP_SECRET"),
        profile_api_key: optional("PROFILE_API_KEY"),
        profile_api_host: or_default("PROFILE_API_HOST", "instagram-scraper-2022.p.rapidapi.com"),
        oauth_redirect_origin: or_default("KLIP_OAUTH_REDIRECT_ORIGIN", "http://localhost:5173"),
        demo_mode: parse_bool("KLIP_DEMO_MODE", "false")?,
        stub_metrics: parse_bool("KLIP_STUB_METRICS", "false")?,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn minimal_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([("DATABASE_URL", "postgres://localhost/klip")])
    }

    #[test]
    fn minimal_env_uses_defaults() {
        let map = minimal_env();
        let config = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.provider_request_timeout_secs, 30);
        assert_eq!(config.provider_max_retries, 2);
        assert!(config.youtube_api_key.is_none());
        assert!(!config.demo_mode);
        assert!(!config.stub_metrics);
    }

    #[test]
    fn missing_database_url_fails() {
        let map = HashMap::new();
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn invalid_bind_addr_is_reported_with_var_name() {
        let mut map = minimal_env();
        map.insert("KLIP_BIND_ADDR", "not-an-addr");
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { var, .. } if var == "KLIP_BIND_ADDR"));
    }

    #[test]
    fn bool_flags_parse_common_spellings() {
        let mut map = minimal_env();
        map.insert("KLIP_DEMO_MODE", "true");
        map.insert("KLIP_STUB_METRICS", "1");
        let config = build_app_config(lookup_from_map(&map)).unwrap();
        assert!(config.demo_mode);
        assert!(config.stub_metrics);
    }

    #[test]
    fn invalid_bool_is_an_error() {
        let mut map = minimal_env();
        map.insert("KLIP_DEMO_MODE", "maybe");
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { var, .. } if var == "KLIP_DEMO_MODE"));
    }

    #[test]
    fn blank_optional_credentials_read_as_absent() {
        let mut map = minimal_env();
        map.insert("YOUTUBE_API_KEY", "  ");
        let config = build_app_config(lookup_from_map(&map)).unwrap();
        assert!(config.youtube_api_key.is_none());
    }

    #[test]
    fn production_environment_parses() {
        let mut map = minimal_env();
        map.insert("KLIP_ENV", "production");
        let config = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config.env, Environment::Production);
    }
}
