//! Dashboard aggregates, derived on read from the latest snapshots.

use axum::{extract::State, http::HeaderMap, Extension, Json};
use rust_decimal::Decimal;
use serde::Serialize;

use klip_core::money;

use crate::middleware::RequestId;

use super::{
    map_db_error, require_admin, require_user, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Serialize)]
pub(in crate::api) struct CreatorDashboard {
    pub total_views: i64,
    pub total_submissions: i64,
    pub money_earned: Decimal,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct AdminDashboard {
    pub total_views: i64,
    pub total_submissions: i64,
}

/// GET /api/v1/dashboard/creator — the caller's latest-view totals and
/// earnings across all their submissions.
pub(in crate::api) async fn creator_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<CreatorDashboard>>, ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    let total_views = klip_db::snapshots::total_latest_views_for_user(&state.pool, user.user_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let total_submissions =
        klip_db::submissions::count_submissions_for_user(&state.pool, user.user_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;

    // Earnings need each campaign's CPM, so they are summed per submission
    // rather than in one aggregate.
    let submissions = klip_db::submissions::list_submissions_for_user(&state.pool, user.user_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let mut money_earned = Decimal::ZERO;
    for submission in &submissions {
        let latest = klip_db::snapshots::latest_snapshot(&state.pool, submission.id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        let Some(latest) = latest else { continue };
        let campaign = klip_db::campaigns::get_campaign(&state.pool, submission.campaign_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        money_earned += money::earnings(latest.views_u64(), campaign.cpm);
    }

    Ok(Json(ApiResponse {
        data: CreatorDashboard {
            total_views,
            total_submissions,
            money_earned,
        },
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// GET /api/v1/dashboard/admin — platform-wide totals across every snapshot.
pub(in crate::api) async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<AdminDashboard>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    let total_views = klip_db::snapshots::total_snapshot_views(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let total_submissions = klip_db::submissions::count_submissions(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: AdminDashboard {
            total_views,
            total_submissions,
        },
        meta: ResponseMeta::new(rid.clone()),
    }))
}
