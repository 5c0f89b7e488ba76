pub mod accounts;
pub mod app_config;
pub mod config;
pub mod metrics;
pub mod money;
pub mod platform;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use metrics::{cache_is_stale, MetricRecord, STALENESS_WINDOW_SECS};
pub use platform::{AccountStatus, MembershipStatus, Platform, SubmissionStatus};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
