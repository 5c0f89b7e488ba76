//! Connected-account handlers: creation, verification, and metric reads.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use klip_core::{accounts as account_rules, cache_is_stale, AccountStatus, MetricRecord, Platform};
use klip_db::ConnectedAccountRow;
use klip_providers::{demo, ContentMetricRecord, ProviderError};

use crate::middleware::RequestId;
use crate::tasks;

use super::{
    map_conflict, map_db_error, map_provider_error, require_admin, require_user, ApiError,
    ApiResponse, AppState, ResponseMeta,
};

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateAccountRequest {
    pub platform: Platform,
    pub handle: String,
    pub profile_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ManualLinkRequest {
    pub platform: Platform,
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct AdminVerifyRequest {
    pub status: AccountStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ContentMetricsQuery {
    pub max_results: Option<usize>,
}

/// Account shape on the wire. OAuth tokens never leave the database; the
/// response only says whether one is held and when it expires.
#[derive(Debug, Serialize)]
pub(in crate::api) struct AccountView {
    pub id: i64,
    pub platform: String,
    pub handle: String,
    pub profile_url: String,
    pub status: String,
    pub verification_code: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_note: String,
    pub has_oauth_token: bool,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub latest_metrics: Option<serde_json::Value>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ConnectedAccountRow> for AccountView {
    fn from(row: ConnectedAccountRow) -> Self {
        Self {
            id: row.id,
            platform: row.platform,
            handle: row.handle,
            profile_url: row.profile_url,
            status: row.status,
            verification_code: row.verification_code,
            verified_at: row.verified_at,
            verification_note: row.verification_note,
            has_oauth_token: row.access_token.is_some(),
            token_expires_at: row.token_expires_at,
            latest_metrics: row.latest_metrics,
            last_synced_at: row.last_synced_at,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Loads an account and checks the caller owns it (or is an admin).
async fn load_owned_account(
    state: &AppState,
    request_id: &str,
    headers: &HeaderMap,
    id: i64,
) -> Result<ConnectedAccountRow, ApiError> {
    let user = require_user(request_id, headers)?;
    let account = klip_db::accounts::get_account(&state.pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    if account.user_id != user.user_id && !user.is_admin {
        // Hide the existence of other users' accounts.
        return Err(ApiError::new(request_id, "not_found", "record not found"));
    }
    Ok(account)
}

fn parse_platform(request_id: &str, account: &ConnectedAccountRow) -> Result<Platform, ApiError> {
    account.platform().map_err(|e| {
        tracing::error!(account = account.id, error = %e, "stored platform is unknown");
        ApiError::new(request_id, "internal_error", "stored platform is unknown")
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/accounts — link a new account, entering PENDING with a fresh
/// verification code.
pub(in crate::api) async fn create_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountView>>), ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    let handle = account_rules::normalize_handle(body.platform, &body.handle);
    if handle.trim_start_matches('@').is_empty() {
        return Err(ApiError::new(rid, "validation_error", "handle is required"));
    }
    let profile_url = body
        .profile_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| account_rules::default_profile_url(body.platform, &handle));
    let code = account_rules::generate_verification_code();

    let row = klip_db::accounts::create_account(
        &state.pool,
        user.user_id,
        body.platform,
        &handle,
        &profile_url,
        &code,
    )
    .await
    .map_err(|e| map_conflict(rid, &e, "this account is already linked"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(rid.clone()),
        }),
    ))
}

/// GET /api/v1/accounts — own accounts; admins see all.
pub(in crate::api) async fn list_accounts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<AccountView>>>, ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    let rows = if user.is_admin {
        klip_db::accounts::list_all_accounts(&state.pool).await
    } else {
        klip_db::accounts::list_accounts_for_user(&state.pool, user.user_id).await
    }
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(AccountView::from).collect(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// GET /api/v1/accounts/{id}/metrics — staleness-gated metric read.
///
/// Fresh cache: returned immediately, no network. Stale cache: an async
/// refresh is enqueued and the stale record is returned. Cold start (no
/// cache at all): one synchronous fetch on top of the enqueued refresh, so
/// the first read never comes back empty — the possible double fetch is an
/// accepted tradeoff.
pub(in crate::api) async fn account_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MetricRecord>>, ApiError> {
    let rid = &req_id.0;
    let account = load_owned_account(&state, rid, &headers, id).await?;

    let now = Utc::now();
    let cached = account.cached_metrics();
    let stale = cache_is_stale(cached.is_some(), account.last_synced_at, now);

    if let Some(cached) = cached {
        if stale {
            tasks::spawn_account_sync(state.pool.clone(), state.registry.clone(), account.id);
        }
        return Ok(Json(ApiResponse {
            data: cached,
            meta: ResponseMeta::new(rid.clone()),
        }));
    }

    // Cold start: enqueue the refresh and also fetch inline once.
    tasks::spawn_account_sync(state.pool.clone(), state.registry.clone(), account.id);

    let platform = parse_platform(rid, &account)?;
    let provider = state.registry.resolve(platform);
    let token = account.usable_access_token(now).map(ToOwned::to_owned);
    let metrics = provider
        .fetch_analytics(&account.handle, token.as_deref())
        .await;

    if let Err(e) = klip_db::accounts::store_account_metrics(&state.pool, account.id, &metrics).await
    {
        // The read still succeeds; the cache just stays cold.
        tracing::error!(account = account.id, error = %e, "storing cold-start metrics failed");
    }

    Ok(Json(ApiResponse {
        data: metrics,
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// GET /api/v1/accounts/{id}/content-metrics — per-upload breakdown.
///
/// Requires an OAuth-linked account, except for demo-allow-listed handles
/// when demo mode is on.
pub(in crate::api) async fn account_content_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<ContentMetricsQuery>,
) -> Result<Json<ApiResponse<Vec<ContentMetricRecord>>>, ApiError> {
    let rid = &req_id.0;
    let account = load_owned_account(&state, rid, &headers, id).await?;
    let platform = parse_platform(rid, &account)?;

    let provider = state.registry.resolve(platform);
    if !provider.supports_content_analytics() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "content analytics is not supported for this platform",
        ));
    }

    let token = account
        .usable_access_token(Utc::now())
        .map(ToOwned::to_owned);
    let is_demo = state.config.demo_mode && demo::is_allowlisted(&account.handle);
    if token.is_none() && !is_demo {
        return Err(ApiError::new(
            rid,
            "unauthorized",
            "account must be linked via OAuth for content analytics",
        ));
    }

    let max_results = query.max_results.unwrap_or(25).clamp(1, 50);
    let content = provider
        .fetch_content_analytics(token.as_deref(), &account.handle, max_results)
        .await
        .map_err(|e| map_provider_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: content,
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// POST /api/v1/accounts/manual-link — upsert a VERIFIED account by handle,
/// without OAuth or bio proof.
pub(in crate::api) async fn manual_link(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<ManualLinkRequest>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    let handle = account_rules::normalize_handle(body.platform, &body.handle);
    if handle.trim_start_matches('@').is_empty() {
        return Err(ApiError::new(rid, "validation_error", "handle is required"));
    }
    let profile_url = account_rules::default_profile_url(body.platform, &handle);

    let row = klip_db::accounts::upsert_manual_account(
        &state.pool,
        user.user_id,
        body.platform,
        &handle,
        &profile_url,
        "Linked manually (live tracking active)",
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// POST /api/v1/accounts/{id}/verify-bio — prove ownership by placing the
/// verification code in the profile biography.
///
/// Handles ending in `_demo` auto-verify without any external call when demo
/// mode is on. On a failed check the fetched biography is returned so the
/// user can self-diagnose.
pub(in crate::api) async fn verify_bio(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    let rid = &req_id.0;
    let account = load_owned_account(&state, rid, &headers, id).await?;

    if account.is_verified() {
        return Err(ApiError::new(rid, "validation_error", "already verified"));
    }

    if state.config.demo_mode && account_rules::is_demo_handle(&account.handle) {
        let row = mark_verified(&state, rid, account.id).await?;
        return Ok(Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(rid.clone()),
        }));
    }

    let Some(code) = account.verification_code.clone() else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "account has no verification code; relink it to get one",
        ));
    };

    let username = account_rules::username_from_profile_url(&account.profile_url);
    tracing::debug!(account = account.id, username = %username, "verifying bio code");

    let biography = match state.profile.fetch_biography(&username).await {
        Ok(biography) => biography,
        Err(e @ ProviderError::ProfileLookup { .. }) => {
            return Err(ApiError::new(
                rid,
                "verification_failed",
                format!("could not fetch the profile: {e}"),
            ));
        }
        Err(e) => return Err(map_provider_error(rid, &e)),
    };

    if !biography.contains(&code) {
        return Err(ApiError::new(
            rid,
            "verification_failed",
            format!("verification code '{code}' not found in bio. Found bio: '{biography}'"),
        ));
    }

    let row = mark_verified(&state, rid, account.id).await?;
    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}

async fn mark_verified(
    state: &AppState,
    request_id: &str,
    account_id: i64,
) -> Result<ConnectedAccountRow, ApiError> {
    match klip_db::accounts::mark_bio_verified(&state.pool, account_id).await {
        Ok(row) => Ok(row),
        Err(klip_db::DbError::InvalidAccountTransition { .. }) => Err(ApiError::new(
            request_id,
            "conflict",
            "account verification was already decided",
        )),
        Err(e) => Err(map_db_error(request_id.to_owned(), &e)),
    }
}

/// PATCH /api/v1/accounts/{id}/verify — administrator force verify/reject,
/// bypassing bio and OAuth proof.
pub(in crate::api) async fn admin_verify(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<AdminVerifyRequest>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &headers)?;

    if body.status == AccountStatus::Pending {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "status must be VERIFIED or REJECTED",
        ));
    }

    let row = klip_db::accounts::admin_set_status(
        &state.pool,
        id,
        body.status,
        body.note.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}
