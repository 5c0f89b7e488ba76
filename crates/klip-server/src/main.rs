mod api;
mod middleware;
mod scheduler;
mod tasks;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(klip_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if config.demo_mode {
        tracing::warn!("demo mode enabled: canned records and the _demo verification bypass are live");
    }
    if config.stub_metrics {
        tracing::warn!("stub metrics enabled: OTHER-platform fetches return randomized data");
    }

    let pool_config = klip_db::PoolConfig::from_app_config(&config);
    let pool = klip_db::connect_pool(&config.database_url, pool_config).await?;
    klip_db::run_migrations(&pool).await?;

    let (registry, oauth, profile) = klip_providers::build_from_config(&config)?;

    let _scheduler = scheduler::build_scheduler(pool.clone(), registry.clone()).await?;

    let auth = AuthState::from_env(matches!(config.env, klip_core::Environment::Development))?;
    let state = AppState {
        pool,
        config: Arc::clone(&config),
        registry,
        oauth: Arc::new(oauth),
        profile: Arc::new(profile),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
