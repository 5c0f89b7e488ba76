//! Database operations for `campaigns` and `campaign_memberships`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use klip_core::MembershipStatus;

use crate::DbError;

const CAMPAIGN_COLUMNS: &str =
    "id, public_id, name, budget_total, budget_paid, cpm, created_at";
const MEMBERSHIP_COLUMNS: &str =
    "id, campaign_id, user_id, status, created_at, updated_at";

/// A row from the `campaigns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub budget_total: Decimal,
    pub budget_paid: Decimal,
    pub cpm: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A row from the `campaign_memberships` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignMembershipRow {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creates a campaign with its budget and CPM rate.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_campaign(
    pool: &PgPool,
    name: &str,
    budget_total: Decimal,
    cpm: Decimal,
) -> Result<CampaignRow, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "INSERT INTO campaigns (public_id, name, budget_total, cpm) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {CAMPAIGN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(budget_total)
    .bind(cpm)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no campaign has this id.
pub async fn get_campaign(pool: &PgPool, id: i64) -> Result<CampaignRow, DbError> {
    sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns(pool: &PgPool) -> Result<Vec<CampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Requests membership in a campaign; lands in `PENDING`.
///
/// A duplicate join hits the unique constraint so the API can answer 409.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including the unique
/// violation, detectable via [`DbError::is_unique_violation`]).
pub async fn join_campaign(
    pool: &PgPool,
    campaign_id: i64,
    user_id: Uuid,
) -> Result<CampaignMembershipRow, DbError> {
    let row = sqlx::query_as::<_, CampaignMembershipRow>(&format!(
        "INSERT INTO campaign_memberships (campaign_id, user_id, status) \
         VALUES ($1, $2, 'PENDING') \
         RETURNING {MEMBERSHIP_COLUMNS}"
    ))
    .bind(campaign_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Administrator decision on a membership request.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user never requested membership.
pub async fn set_membership_status(
    pool: &PgPool,
    campaign_id: i64,
    user_id: Uuid,
    status: MembershipStatus,
) -> Result<CampaignMembershipRow, DbError> {
    let row = sqlx::query_as::<_, CampaignMembershipRow>(&format!(
        "UPDATE campaign_memberships \
         SET status = $3, updated_at = NOW() \
         WHERE campaign_id = $1 AND user_id = $2 \
         RETURNING {MEMBERSHIP_COLUMNS}"
    ))
    .bind(campaign_id)
    .bind(user_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;
    row.ok_or(DbError::NotFound)
}

/// The user's `APPROVED` membership for a campaign, if any. Submission
/// creation is gated on this.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_approved_membership(
    pool: &PgPool,
    campaign_id: i64,
    user_id: Uuid,
) -> Result<Option<CampaignMembershipRow>, DbError> {
    let row = sqlx::query_as::<_, CampaignMembershipRow>(&format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM campaign_memberships \
         WHERE campaign_id = $1 AND user_id = $2 AND status = 'APPROVED'"
    ))
    .bind(campaign_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
