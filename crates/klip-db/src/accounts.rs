//! Database operations for `connected_accounts`.
//!
//! Status transitions are guarded in SQL (`WHERE status = …`) so concurrent
//! verifications cannot double-fire, and the cached metric record is
//! replaced in a single UPDATE — last write wins under racing refreshes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use klip_core::{AccountStatus, MetricRecord, Platform};

use crate::DbError;

const ACCOUNT_COLUMNS: &str = "id, public_id, user_id, platform, handle, profile_url, status, \
     verification_code, verified_at, verification_note, access_token, refresh_token, \
     token_expires_at, latest_metrics, last_synced_at, created_at, updated_at";

/// A row from the `connected_accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectedAccountRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub handle: String,
    pub profile_url: String,
    pub status: String,
    pub verification_code: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_note: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub latest_metrics: Option<serde_json::Value>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectedAccountRow {
    /// # Errors
    ///
    /// Returns the raw string if the stored platform is not a known variant.
    pub fn platform(&self) -> Result<Platform, klip_core::platform::UnknownVariant> {
        self.platform.parse()
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status == AccountStatus::Verified.as_str()
    }

    /// Cached metric record, if one has been stored and still deserializes.
    #[must_use]
    pub fn cached_metrics(&self) -> Option<MetricRecord> {
        self.latest_metrics
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// The stored access token, unless it has passed its recorded expiry.
    ///
    /// Tokens are never refreshed proactively; an expired token is treated
    /// as absent so providers fall back to their keyed or zero paths.
    #[must_use]
    pub fn usable_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        if let Some(expires_at) = self.token_expires_at {
            if expires_at <= now {
                tracing::debug!(
                    account = self.id,
                    platform = %self.platform,
                    "stored access token is expired; treating as absent"
                );
                return None;
            }
        }
        Some(token)
    }
}

/// Fields stored when an OAuth exchange links or relinks an account.
#[derive(Debug, Clone)]
pub struct NewOAuthAccount {
    pub user_id: Uuid,
    pub platform: Platform,
    pub handle: String,
    pub profile_url: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub verification_note: String,
}

/// Creates a new account in `PENDING` with a fresh verification code.
///
/// A second create with the same (user, platform, handle) hits the unique
/// constraint; the caller maps that to a conflict response.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including the unique
/// violation, detectable via [`DbError::is_unique_violation`]).
pub async fn create_account(
    pool: &PgPool,
    user_id: Uuid,
    platform: Platform,
    handle: &str,
    profile_url: &str,
    verification_code: &str,
) -> Result<ConnectedAccountRow, DbError> {
    let row = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "INSERT INTO connected_accounts \
             (public_id, user_id, platform, handle, profile_url, status, verification_code) \
         VALUES ($1, $2, $3, $4, $5, 'PENDING', $6) \
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(platform.as_str())
    .bind(handle)
    .bind(profile_url)
    .bind(verification_code)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no account has this id.
pub async fn get_account(pool: &PgPool, id: i64) -> Result<ConnectedAccountRow, DbError> {
    sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_accounts_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ConnectedAccountRow>, DbError> {
    let rows = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts \
         WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All accounts, newest first. Admin listing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_accounts(pool: &PgPool) -> Result<Vec<ConnectedAccountRow>, DbError> {
    let rows = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Every `VERIFIED` account, for the periodic sweep.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_verified_accounts(pool: &PgPool) -> Result<Vec<ConnectedAccountRow>, DbError> {
    let rows = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts \
         WHERE status = 'VERIFIED' ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The user's `VERIFIED` account for a platform, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_verified_account(
    pool: &PgPool,
    user_id: Uuid,
    platform: Platform,
) -> Result<Option<ConnectedAccountRow>, DbError> {
    let row = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts \
         WHERE user_id = $1 AND platform = $2 AND status = 'VERIFIED' \
         ORDER BY created_at LIMIT 1"
    ))
    .bind(user_id)
    .bind(platform.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Marks a `PENDING` account `VERIFIED` and stamps `verified_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidAccountTransition`] if the account is not in
/// `PENDING` — there is no path back into verification once decided.
pub async fn mark_bio_verified(pool: &PgPool, id: i64) -> Result<ConnectedAccountRow, DbError> {
    let row = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "UPDATE connected_accounts \
         SET status = 'VERIFIED', verified_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND status = 'PENDING' \
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::InvalidAccountTransition {
        id,
        expected_status: "PENDING",
    })
}

/// Administrator override: force `VERIFIED` (stamping `verified_at`) or
/// `REJECTED`, from any current status.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no account has this id.
pub async fn admin_set_status(
    pool: &PgPool,
    id: i64,
    status: AccountStatus,
    note: Option<&str>,
) -> Result<ConnectedAccountRow, DbError> {
    let row = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "UPDATE connected_accounts \
         SET status = $2, \
             verified_at = CASE WHEN $2 = 'VERIFIED' THEN NOW() ELSE verified_at END, \
             verification_note = COALESCE($3, verification_note), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(note)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Update-or-insert for OAuth linking, keyed on `(user_id, platform)`.
///
/// OAuth holds one account per user per platform: a relink replaces the
/// handle and tokens in place. The account lands directly in `VERIFIED`,
/// bypassing `PENDING`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update or insert fails.
pub async fn upsert_oauth_account(
    pool: &PgPool,
    new: &NewOAuthAccount,
) -> Result<ConnectedAccountRow, DbError> {
    let updated = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "UPDATE connected_accounts \
         SET handle = $3, profile_url = $4, status = 'VERIFIED', \
             verified_at = COALESCE(verified_at, NOW()), \
             access_token = $5, refresh_token = $6, token_expires_at = $7, \
             verification_note = $8, updated_at = NOW() \
         WHERE id = (SELECT id FROM connected_accounts \
                     WHERE user_id = $1 AND platform = $2 \
                     ORDER BY created_at LIMIT 1) \
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(new.user_id)
    .bind(new.platform.as_str())
    .bind(&new.handle)
    .bind(&new.profile_url)
    .bind(&new.access_token)
    .bind(&new.refresh_token)
    .bind(new.token_expires_at)
    .bind(&new.verification_note)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = updated {
        return Ok(row);
    }

    let row = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "INSERT INTO connected_accounts \
             (public_id, user_id, platform, handle, profile_url, status, verified_at, \
              access_token, refresh_token, token_expires_at, verification_note) \
         VALUES ($1, $2, $3, $4, $5, 'VERIFIED', NOW(), $6, $7, $8, $9) \
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.platform.as_str())
    .bind(&new.handle)
    .bind(&new.profile_url)
    .bind(&new.access_token)
    .bind(&new.refresh_token)
    .bind(new.token_expires_at)
    .bind(&new.verification_note)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Update-or-insert for manual linking, keyed on `(user_id, platform,
/// handle)`. The account lands directly in `VERIFIED`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_manual_account(
    pool: &PgPool,
    user_id: Uuid,
    platform: Platform,
    handle: &str,
    profile_url: &str,
    note: &str,
) -> Result<ConnectedAccountRow, DbError> {
    let row = sqlx::query_as::<_, ConnectedAccountRow>(&format!(
        "INSERT INTO connected_accounts \
             (public_id, user_id, platform, handle, profile_url, status, verified_at, \
              verification_note) \
         VALUES ($1, $2, $3, $4, $5, 'VERIFIED', NOW(), $6) \
         ON CONFLICT (user_id, platform, handle) DO UPDATE \
         SET status = 'VERIFIED', \
             verified_at = COALESCE(connected_accounts.verified_at, NOW()), \
             profile_url = EXCLUDED.profile_url, \
             verification_note = EXCLUDED.verification_note, \
             updated_at = NOW() \
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(platform.as_str())
    .bind(handle)
    .bind(profile_url)
    .bind(note)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Atomically replaces the cached metric record and sync timestamp.
///
/// Racing refreshes each write a complete record, so the winner is simply
/// the last to commit — no partial state is observable.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no account has this id.
pub async fn store_account_metrics(
    pool: &PgPool,
    id: i64,
    metrics: &MetricRecord,
) -> Result<(), DbError> {
    let payload = serde_json::to_value(metrics).unwrap_or_default();
    let result = sqlx::query(
        "UPDATE connected_accounts \
         SET latest_metrics = $2, last_synced_at = NOW(), updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(payload)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
