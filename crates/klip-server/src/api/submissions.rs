//! Submission handlers: gated creation, review decisions, and the snapshot
//! history read.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use klip_core::{money, Platform, SubmissionStatus};
use klip_db::{AnalyticsSnapshotRow, NewSubmission, SubmissionRow};

use crate::middleware::RequestId;
use crate::tasks;

use super::{
    map_db_error, require_admin, require_user, ApiError, ApiResponse, AppState, ResponseMeta,
};

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateSubmissionRequest {
    pub campaign: i64,
    pub platform: Platform,
    pub title: Option<String>,
    pub original_url: String,
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Default)]
pub(in crate::api) struct RejectSubmissionRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct SnapshotView {
    pub id: i64,
    pub fetched_at: DateTime<Utc>,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

impl From<AnalyticsSnapshotRow> for SnapshotView {
    fn from(row: AnalyticsSnapshotRow) -> Self {
        Self {
            id: row.id,
            fetched_at: row.fetched_at,
            views: row.views,
            likes: row.likes,
            comments: row.comments,
            shares: row.shares,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct SubmissionView {
    pub id: i64,
    pub campaign_id: i64,
    pub platform: String,
    pub title: String,
    pub original_url: String,
    pub normalized_url: String,
    pub status: String,
    pub rejection_reason: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub latest_analytics: Option<SnapshotView>,
    /// Derived on read, never stored: `round(latest views / 1000 × cpm, 2)`.
    pub money_owed: Decimal,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Builds the wire view: latest snapshot plus earnings at the campaign CPM.
async fn submission_view(
    state: &AppState,
    request_id: &str,
    row: SubmissionRow,
) -> Result<SubmissionView, ApiError> {
    let latest = klip_db::snapshots::latest_snapshot(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    let campaign = klip_db::campaigns::get_campaign(&state.pool, row.campaign_id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;

    let money_owed = latest
        .as_ref()
        .map_or(Decimal::ZERO, |s| money::earnings(s.views_u64(), campaign.cpm));

    Ok(SubmissionView {
        id: row.id,
        campaign_id: row.campaign_id,
        platform: row.platform,
        title: row.title,
        original_url: row.original_url,
        normalized_url: row.normalized_url,
        status: row.status,
        rejection_reason: row.rejection_reason,
        posted_at: row.posted_at,
        submitted_at: row.submitted_at,
        latest_analytics: latest.map(SnapshotView::from),
        money_owed,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/submissions — create a submission and enqueue its first
/// snapshot fetch.
///
/// Gates, in order and all before any external call: the campaign exists,
/// the caller holds an APPROVED membership, the caller holds a VERIFIED
/// account for the platform, and — where the platform's URLs carry the
/// author handle — the handle appears in the submitted URL.
pub(in crate::api) async fn create_submission(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionView>>), ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    let original_url = body.original_url.trim().to_owned();
    if original_url.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "original_url is required",
        ));
    }

    klip_db::campaigns::get_campaign(&state.pool, body.campaign)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let membership =
        klip_db::campaigns::find_approved_membership(&state.pool, body.campaign, user.user_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
    if membership.is_none() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "you must be an approved member of this campaign to submit",
        ));
    }

    let account =
        klip_db::accounts::find_verified_account(&state.pool, user.user_id, body.platform)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
    let Some(account) = account else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!(
                "connect and verify your {} account before submitting",
                body.platform
            ),
        ));
    };

    // Reel/short URLs on the remaining platforms don't carry the author
    // handle, so ownership there rests on the verified account alone.
    if body.platform.supports_url_ownership_check() {
        let handle = account.handle.trim_start_matches('@').to_lowercase();
        if !original_url.to_lowercase().contains(&handle) {
            return Err(ApiError::new(
                rid,
                "validation_error",
                format!(
                    "the submission URL must contain your verified handle (@{handle})"
                ),
            ));
        }
    }

    let row = klip_db::submissions::create_submission(
        &state.pool,
        &NewSubmission {
            campaign_id: body.campaign,
            user_id: user.user_id,
            platform: body.platform,
            title: body.title.unwrap_or_default(),
            normalized_url: original_url.clone(),
            original_url,
            posted_at: body.posted_at,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tasks::spawn_submission_fetch(state.pool.clone(), state.registry.clone(), row.id);

    let view = submission_view(&state, rid, row).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: view,
            meta: ResponseMeta::new(rid.clone()),
        }),
    ))
}

/// GET /api/v1/submissions — own submissions; admins see all.
pub(in crate::api) async fn list_submissions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<SubmissionView>>>, ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    let rows = if user.is_admin {
        klip_db::submissions::list_all_submissions(&state.pool).await
    } else {
        klip_db::submissions::list_submissions_for_user(&state.pool, user.user_id).await
    }
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(submission_view(&state, rid, row).await?);
    }

    Ok(Json(ApiResponse {
        data: views,
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// POST /api/v1/submissions/{id}/approve — administrator decision.
pub(in crate::api) async fn approve_submission(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SubmissionView>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    let row = klip_db::submissions::set_submission_status(
        &state.pool,
        id,
        SubmissionStatus::Approved,
        None,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let view = submission_view(&state, rid, row).await?;
    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// POST /api/v1/submissions/{id}/reject — administrator decision. The body
/// may be `{}` when no reason is recorded.
pub(in crate::api) async fn reject_submission(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<RejectSubmissionRequest>,
) -> Result<Json<ApiResponse<SubmissionView>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    let reason = body.reason;
    let row = klip_db::submissions::set_submission_status(
        &state.pool,
        id,
        SubmissionStatus::Rejected,
        reason.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let view = submission_view(&state, rid, row).await?;
    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// GET /api/v1/submissions/{id}/analytics — full snapshot history, newest
/// first.
pub(in crate::api) async fn submission_analytics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<SnapshotView>>>, ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    let submission = klip_db::submissions::get_submission(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if submission.user_id != user.user_id && !user.is_admin {
        return Err(ApiError::new(rid, "not_found", "record not found"));
    }

    let snapshots = klip_db::snapshots::list_snapshots(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: snapshots.into_iter().map(SnapshotView::from).collect(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}
