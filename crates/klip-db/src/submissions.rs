//! Database operations for `submissions`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use klip_core::{Platform, SubmissionStatus};

use crate::DbError;

const SUBMISSION_COLUMNS: &str = "id, public_id, campaign_id, user_id, platform, title, \
     original_url, normalized_url, status, rejection_reason, posted_at, submitted_at";

/// A row from the `submissions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub public_id: Uuid,
    pub campaign_id: i64,
    pub user_id: Uuid,
    pub platform: String,
    pub title: String,
    pub original_url: String,
    pub normalized_url: String,
    pub status: String,
    pub rejection_reason: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRow {
    /// # Errors
    ///
    /// Returns the raw string if the stored platform is not a known variant.
    pub fn platform(&self) -> Result<Platform, klip_core::platform::UnknownVariant> {
        self.platform.parse()
    }
}

/// Fields required to create a submission. Validation (membership, verified
/// account, handle match) happens in the API layer before this is reached.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub campaign_id: i64,
    pub user_id: Uuid,
    pub platform: Platform,
    pub title: String,
    pub original_url: String,
    /// Cleaned URL used for tracking; defaults to `original_url` upstream.
    pub normalized_url: String,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Creates a submission in `ACTIVE` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_submission(
    pool: &PgPool,
    new: &NewSubmission,
) -> Result<SubmissionRow, DbError> {
    let row = sqlx::query_as::<_, SubmissionRow>(&format!(
        "INSERT INTO submissions \
             (public_id, campaign_id, user_id, platform, title, original_url, \
              normalized_url, posted_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.campaign_id)
    .bind(new.user_id)
    .bind(new.platform.as_str())
    .bind(&new.title)
    .bind(&new.original_url)
    .bind(&new.normalized_url)
    .bind(new.posted_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no submission has this id.
pub async fn get_submission(pool: &PgPool, id: i64) -> Result<SubmissionRow, DbError> {
    sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_submissions_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<SubmissionRow>, DbError> {
    let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions \
         WHERE user_id = $1 ORDER BY submitted_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All submissions, newest first. Admin listing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_submissions(pool: &PgPool) -> Result<Vec<SubmissionRow>, DbError> {
    let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY submitted_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// `ACTIVE` submissions for the periodic sweep, optionally scoped to one
/// campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_submissions(
    pool: &PgPool,
    campaign_id: Option<i64>,
) -> Result<Vec<SubmissionRow>, DbError> {
    let rows = match campaign_id {
        Some(campaign_id) => {
            sqlx::query_as::<_, SubmissionRow>(&format!(
                "SELECT {SUBMISSION_COLUMNS} FROM submissions \
                 WHERE status = 'ACTIVE' AND campaign_id = $1 ORDER BY id"
            ))
            .bind(campaign_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, SubmissionRow>(&format!(
                "SELECT {SUBMISSION_COLUMNS} FROM submissions \
                 WHERE status = 'ACTIVE' ORDER BY id"
            ))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Moves a submission to a new review status.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no submission has this id.
pub async fn set_submission_status(
    pool: &PgPool,
    id: i64,
    status: SubmissionStatus,
    rejection_reason: Option<&str>,
) -> Result<SubmissionRow, DbError> {
    let row = sqlx::query_as::<_, SubmissionRow>(&format!(
        "UPDATE submissions \
         SET status = $2, rejection_reason = COALESCE($3, rejection_reason) \
         WHERE id = $1 \
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(rejection_reason)
    .fetch_optional(pool)
    .await?;
    row.ok_or(DbError::NotFound)
}

/// Total number of submissions, for the admin dashboard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_submissions(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Number of submissions owned by one user, for the creator dashboard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_submissions_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, DbError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
