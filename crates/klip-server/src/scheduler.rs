//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the two
//! recurring sweeps: account metric refreshes and submission snapshot
//! fetches. The starts are offset within the hour so the sweeps never kick
//! off together.

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use klip_providers::ProviderRegistry;

use crate::tasks;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    registry: ProviderRegistry,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_account_sweep(&scheduler, pool.clone(), registry.clone()).await?;
    register_submission_sweep(&scheduler, pool, registry).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Hourly refresh of every VERIFIED account's cached metrics, at :10.
///
/// The cadence matches the one-hour staleness window: by the time a cached
/// record could go stale, the sweep has usually replaced it already.
async fn register_account_sweep(
    scheduler: &JobScheduler,
    pool: PgPool,
    registry: ProviderRegistry,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 10 * * * *", move |_uuid, _lock| {
        let pool = pool.clone();
        let registry = registry.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting verified-account sweep");
            let triggered = tasks::sweep_verified_accounts(&pool, &registry).await;
            tracing::info!(triggered, "scheduler: verified-account sweep complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Hourly snapshot fetch for every ACTIVE submission, at :40.
async fn register_submission_sweep(
    scheduler: &JobScheduler,
    pool: PgPool,
    registry: ProviderRegistry,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 40 * * * *", move |_uuid, _lock| {
        let pool = pool.clone();
        let registry = registry.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting active-submission sweep");
            let triggered = tasks::sweep_active_submissions(&pool, &registry, None).await;
            tracing::info!(triggered, "scheduler: active-submission sweep complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
