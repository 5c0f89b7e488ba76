//! Manual sweep triggers, mirroring what the scheduler runs on its cron.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::tasks;

use super::{require_admin, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SweepSubmissionsQuery {
    pub campaign: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct SweepResponse {
    pub triggered: usize,
}

/// POST /api/v1/sweeps/accounts — refresh every VERIFIED account.
pub(in crate::api) async fn sweep_accounts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SweepResponse>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    let triggered = tasks::sweep_verified_accounts(&state.pool, &state.registry).await;

    Ok(Json(ApiResponse {
        data: SweepResponse { triggered },
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// POST /api/v1/sweeps/submissions — snapshot every ACTIVE submission,
/// optionally scoped to one campaign.
pub(in crate::api) async fn sweep_submissions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<SweepSubmissionsQuery>,
) -> Result<Json<ApiResponse<SweepResponse>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    let triggered =
        tasks::sweep_active_submissions(&state.pool, &state.registry, query.campaign).await;

    Ok(Json(ApiResponse {
        data: SweepResponse { triggered },
        meta: ResponseMeta::new(rid.clone()),
    }))
}
