//! Database operations for `analytics_snapshots`.
//!
//! The snapshot stream is append-only: rows are inserted and read, never
//! updated. "Latest" always means most recent `fetched_at`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use klip_core::MetricRecord;

use crate::DbError;

const SNAPSHOT_COLUMNS: &str =
    "id, submission_id, fetched_at, views, likes, comments, shares, extra_data";

/// A row from the `analytics_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalyticsSnapshotRow {
    pub id: i64,
    pub submission_id: i64,
    pub fetched_at: DateTime<Utc>,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub extra_data: serde_json::Value,
}

impl AnalyticsSnapshotRow {
    /// Views as the unsigned count the earnings formula expects.
    #[must_use]
    pub fn views_u64(&self) -> u64 {
        u64::try_from(self.views).unwrap_or(0)
    }
}

fn counter(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Appends one immutable snapshot for a submission.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_snapshot(
    pool: &PgPool,
    submission_id: i64,
    metrics: &MetricRecord,
) -> Result<AnalyticsSnapshotRow, DbError> {
    let extra = serde_json::Value::Object(metrics.extra.clone());
    let row = sqlx::query_as::<_, AnalyticsSnapshotRow>(&format!(
        "INSERT INTO analytics_snapshots \
             (submission_id, views, likes, comments, shares, extra_data) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {SNAPSHOT_COLUMNS}"
    ))
    .bind(submission_id)
    .bind(counter(metrics.views))
    .bind(counter(metrics.likes))
    .bind(counter(metrics.comments))
    .bind(counter(metrics.shares))
    .bind(extra)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// The most recently fetched snapshot for a submission, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_snapshot(
    pool: &PgPool,
    submission_id: i64,
) -> Result<Option<AnalyticsSnapshotRow>, DbError> {
    let row = sqlx::query_as::<_, AnalyticsSnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM analytics_snapshots \
         WHERE submission_id = $1 ORDER BY fetched_at DESC, id DESC LIMIT 1"
    ))
    .bind(submission_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Full snapshot history for a submission, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_snapshots(
    pool: &PgPool,
    submission_id: i64,
) -> Result<Vec<AnalyticsSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalyticsSnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM analytics_snapshots \
         WHERE submission_id = $1 ORDER BY fetched_at DESC, id DESC"
    ))
    .bind(submission_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Sum of latest-snapshot views across one user's submissions, for the
/// creator dashboard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn total_latest_views_for_user(
    pool: &PgPool,
    user_id: uuid::Uuid,
) -> Result<i64, DbError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(latest.views), 0) FROM ( \
             SELECT DISTINCT ON (s.id) a.views \
             FROM submissions s \
             JOIN analytics_snapshots a ON a.submission_id = s.id \
             WHERE s.user_id = $1 \
             ORDER BY s.id, a.fetched_at DESC, a.id DESC \
         ) latest",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(total)
}

/// Sum of views across every snapshot ever taken, for the admin dashboard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn total_snapshot_views(pool: &PgPool) -> Result<i64, DbError> {
    let total =
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(views), 0) FROM analytics_snapshots")
            .fetch_one(pool)
            .await?;
    Ok(total)
}
