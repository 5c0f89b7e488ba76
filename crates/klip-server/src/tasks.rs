//! Background task bodies: account metric refresh, submission snapshot
//! fetches, and the bulk sweeps.
//!
//! Every body catches and logs its own failures — nothing propagates back to
//! the request that enqueued it, and nothing is retried. A crashed refresh
//! just means the cache stays stale for one more cycle. Each body is
//! idempotent: a fetch plus an atomic replace (accounts) or an append
//! (snapshots) can safely run twice.

use chrono::Utc;
use sqlx::PgPool;

use klip_providers::ProviderRegistry;

/// Fire-and-forget refresh of one account's cached metrics.
pub fn spawn_account_sync(pool: PgPool, registry: ProviderRegistry, account_id: i64) {
    tokio::spawn(async move {
        sync_account_metrics(&pool, &registry, account_id).await;
    });
}

/// Fire-and-forget snapshot fetch for one submission.
pub fn spawn_submission_fetch(pool: PgPool, registry: ProviderRegistry, submission_id: i64) {
    tokio::spawn(async move {
        fetch_submission_analytics(&pool, &registry, submission_id).await;
    });
}

/// Refreshes the cached metric record for one connected account.
///
/// Last write wins when two refreshes race: each stores a complete record
/// in a single UPDATE.
pub async fn sync_account_metrics(pool: &PgPool, registry: &ProviderRegistry, account_id: i64) {
    let account = match klip_db::accounts::get_account(pool, account_id).await {
        Ok(account) => account,
        Err(e) => {
            tracing::warn!(account = account_id, error = %e, "account sync: load failed");
            return;
        }
    };
    let Ok(platform) = account.platform() else {
        tracing::warn!(
            account = account_id,
            platform = %account.platform,
            "account sync: unknown platform stored"
        );
        return;
    };

    let provider = registry.resolve(platform);
    let token = account
        .usable_access_token(Utc::now())
        .map(ToOwned::to_owned);
    let metrics = provider
        .fetch_analytics(&account.handle, token.as_deref())
        .await;

    match klip_db::accounts::store_account_metrics(pool, account.id, &metrics).await {
        Ok(()) => {
            tracing::info!(
                account = account.id,
                platform = %platform,
                handle = %account.handle,
                views = metrics.views,
                "account metrics synced"
            );
        }
        Err(e) => {
            tracing::error!(account = account.id, error = %e, "account sync: store failed");
        }
    }
}

/// Appends one immutable analytics snapshot for a submission.
///
/// Token-gated platforms need the matching VERIFIED account's access token;
/// without such an account the fetch is skipped with a warning, not failed.
pub async fn fetch_submission_analytics(
    pool: &PgPool,
    registry: &ProviderRegistry,
    submission_id: i64,
) {
    let submission = match klip_db::submissions::get_submission(pool, submission_id).await {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!(submission = submission_id, error = %e, "snapshot fetch: load failed");
            return;
        }
    };
    let Ok(platform) = submission.platform() else {
        tracing::warn!(
            submission = submission_id,
            platform = %submission.platform,
            "snapshot fetch: unknown platform stored"
        );
        return;
    };

    let token = if platform.requires_access_token() {
        match klip_db::accounts::find_verified_account(pool, submission.user_id, platform).await {
            Ok(Some(account)) => account
                .usable_access_token(Utc::now())
                .map(ToOwned::to_owned),
            Ok(None) => {
                tracing::warn!(
                    submission = submission.id,
                    user = %submission.user_id,
                    platform = %platform,
                    "no verified connected account; skipping snapshot fetch"
                );
                return;
            }
            Err(e) => {
                tracing::error!(submission = submission.id, error = %e, "snapshot fetch: account lookup failed");
                return;
            }
        }
    } else {
        None
    };

    let provider = registry.resolve(platform);
    let metrics = provider
        .fetch_analytics(&submission.normalized_url, token.as_deref())
        .await;

    match klip_db::snapshots::insert_snapshot(pool, submission.id, &metrics).await {
        Ok(snapshot) => {
            tracing::info!(
                submission = submission.id,
                snapshot = snapshot.id,
                views = snapshot.views,
                "analytics snapshot appended"
            );
        }
        Err(e) => {
            tracing::error!(submission = submission.id, error = %e, "snapshot fetch: insert failed");
        }
    }
}

/// Triggers one metric refresh per VERIFIED account. Returns the number of
/// refreshes enqueued.
pub async fn sweep_verified_accounts(pool: &PgPool, registry: &ProviderRegistry) -> usize {
    let accounts = match klip_db::accounts::list_verified_accounts(pool).await {
        Ok(accounts) => accounts,
        Err(e) => {
            tracing::error!(error = %e, "account sweep: listing failed");
            return 0;
        }
    };

    let count = accounts.len();
    for account in accounts {
        spawn_account_sync(pool.clone(), registry.clone(), account.id);
    }
    tracing::info!(count, "account sweep: refreshes enqueued");
    count
}

/// Triggers one snapshot fetch per ACTIVE submission, optionally scoped to a
/// campaign. Returns the number of fetches enqueued.
pub async fn sweep_active_submissions(
    pool: &PgPool,
    registry: &ProviderRegistry,
    campaign_id: Option<i64>,
) -> usize {
    let submissions =
        match klip_db::submissions::list_active_submissions(pool, campaign_id).await {
            Ok(submissions) => submissions,
            Err(e) => {
                tracing::error!(error = %e, "submission sweep: listing failed");
                return 0;
            }
        };

    let count = submissions.len();
    for submission in submissions {
        spawn_submission_fetch(pool.clone(), registry.clone(), submission.id);
    }
    tracing::info!(count, campaign = ?campaign_id, "submission sweep: fetches enqueued");
    count
}
