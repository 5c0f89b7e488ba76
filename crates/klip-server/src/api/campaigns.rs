//! Campaign and membership handlers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use klip_core::{money, MembershipStatus};
use klip_db::{CampaignMembershipRow, CampaignRow};

use crate::middleware::RequestId;

use super::{
    map_conflict, map_db_error, require_admin, require_user, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateCampaignRequest {
    pub name: String,
    pub budget_total: Option<Decimal>,
    pub cpm: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SetMembershipRequest {
    pub status: MembershipStatus,
}

/// Campaign with its derived budget summary.
#[derive(Debug, Serialize)]
pub(in crate::api) struct CampaignView {
    pub id: i64,
    pub name: String,
    pub budget_total: Decimal,
    pub budget_paid: Decimal,
    pub budget_remaining: Decimal,
    pub percent_paid: i32,
    pub cpm: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<CampaignRow> for CampaignView {
    fn from(row: CampaignRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            budget_remaining: money::budget_remaining(row.budget_total, row.budget_paid),
            percent_paid: money::percent_paid(row.budget_total, row.budget_paid),
            budget_total: row.budget_total,
            budget_paid: row.budget_paid,
            cpm: row.cpm,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct MembershipView {
    pub campaign_id: i64,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<CampaignMembershipRow> for MembershipView {
    fn from(row: CampaignMembershipRow) -> Self {
        Self {
            campaign_id: row.campaign_id,
            user_id: row.user_id,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// POST /api/v1/campaigns — administrator creates a campaign.
pub(in crate::api) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignView>>), ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    let name = body.name.trim().to_owned();
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must be 1–200 characters",
        ));
    }
    let budget_total = body.budget_total.unwrap_or(Decimal::ZERO);
    let cpm = body.cpm.unwrap_or_else(|| Decimal::new(1000, 2)); // 10.00
    if budget_total < Decimal::ZERO || cpm < Decimal::ZERO {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "budget_total and cpm must be non-negative",
        ));
    }

    let row = klip_db::campaigns::create_campaign(&state.pool, &name, budget_total, cpm)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(rid.clone()),
        }),
    ))
}

/// GET /api/v1/campaigns — all campaigns, for discovery.
pub(in crate::api) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<CampaignView>>>, ApiError> {
    let rid = &req_id.0;
    require_user(rid, &headers)?;

    let rows = klip_db::campaigns::list_campaigns(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(CampaignView::from).collect(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// GET /api/v1/campaigns/{id} — budget summary.
pub(in crate::api) async fn get_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CampaignView>>, ApiError> {
    let rid = &req_id.0;
    require_user(rid, &headers)?;

    let row = klip_db::campaigns::get_campaign(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// POST /api/v1/campaigns/{id}/join — request membership; lands PENDING.
pub(in crate::api) async fn join_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<MembershipView>>), ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    klip_db::campaigns::get_campaign(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let row = klip_db::campaigns::join_campaign(&state.pool, id, user.user_id)
        .await
        .map_err(|e| map_conflict(rid, &e, "you already requested to join this campaign"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(rid.clone()),
        }),
    ))
}

/// PATCH /api/v1/campaigns/{id}/memberships/{user_id} — administrator
/// decision on a membership request.
pub(in crate::api) async fn set_membership(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path((id, user_id)): Path<(i64, Uuid)>,
    Json(body): Json<SetMembershipRequest>,
) -> Result<Json<ApiResponse<MembershipView>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    let row = klip_db::campaigns::set_membership_status(&state.pool, id, user_id, body.status)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}
