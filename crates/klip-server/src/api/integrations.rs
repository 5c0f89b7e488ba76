//! OAuth integration handlers: connect-URL generation and code exchange.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use klip_core::Platform;
use klip_db::NewOAuthAccount;

use crate::middleware::RequestId;

use super::{
    accounts::AccountView, map_db_error, map_provider_error, require_user, ApiError, ApiResponse,
    AppState, ResponseMeta,
};

#[derive(Debug, Serialize)]
pub(in crate::api) struct ConnectUrlResponse {
    pub url: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct OAuthExchangeRequest {
    pub platform: Platform,
    pub code: String,
}

/// GET /api/v1/integrations/{platform}/connect — authorize URL for the
/// frontend to open.
pub(in crate::api) async fn connect_url(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(platform): Path<String>,
) -> Result<Json<ApiResponse<ConnectUrlResponse>>, ApiError> {
    let rid = &req_id.0;
    require_user(rid, &headers)?;

    let platform: Platform = platform.to_uppercase().parse().map_err(|_| {
        ApiError::new(rid, "validation_error", format!("unknown platform '{platform}'"))
    })?;

    let request = state
        .oauth
        .authorize_url(platform)
        .map_err(|e| map_provider_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: ConnectUrlResponse {
            url: request.url,
            state: request.state,
        },
        meta: ResponseMeta::new(rid.clone()),
    }))
}

/// POST /api/v1/integrations/oauth/exchange — exchange the authorization
/// code for tokens and upsert the connected account as VERIFIED.
///
/// The account bypasses PENDING entirely: a successful exchange is itself
/// the ownership proof. Token expiry is recorded as `now + expires_in`; no
/// refresh is scheduled.
pub(in crate::api) async fn oauth_exchange(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<OAuthExchangeRequest>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    let rid = &req_id.0;
    let user = require_user(rid, &headers)?;

    if body.code.trim().is_empty() {
        return Err(ApiError::new(rid, "validation_error", "code is required"));
    }

    let tokens = state
        .oauth
        .exchange_code(body.platform, &body.code)
        .await
        .map_err(|e| map_provider_error(rid, &e))?;

    let token_expires_at = tokens.expires_in.map(|s| Utc::now() + Duration::seconds(s));

    let (handle, profile_url, note) = match body.platform {
        Platform::Youtube => {
            let channel = state
                .registry
                .youtube()
                .channel_info(&tokens.access_token)
                .await
                .map_err(|e| map_provider_error(rid, &e))?
                .ok_or_else(|| {
                    ApiError::new(
                        rid,
                        "validation_error",
                        "no YouTube channel found for this account",
                    )
                })?;

            let handle = channel
                .custom_url
                .clone()
                .unwrap_or_else(|| format!("channel_{}", channel.channel_id));
            let profile_url = if handle.starts_with('@') {
                format!("https://youtube.com/{handle}")
            } else {
                format!("https://youtube.com/channel/{}", channel.channel_id)
            };
            let note = format!("Linked via OAuth (Channel: {})", channel.title);
            (handle, profile_url, note)
        }
        Platform::Tiktok => {
            // The basic-info call is a follow-up; until then the open_id
            // stands in for the handle.
            let handle = tokens.open_id.clone().unwrap_or_else(|| "tiktok-user".to_owned());
            let profile_url = format!("https://tiktok.com/@{handle}");
            (handle, profile_url, "Linked via OAuth".to_owned())
        }
        Platform::Instagram => {
            // The Graph API exchange yields a Facebook user token; resolving
            // the linked Instagram business handle is a separate lookup that
            // is not wired up, so a placeholder identity is stored.
            (
                "instagram-connected".to_owned(),
                "https://instagram.com/".to_owned(),
                "Linked via OAuth".to_owned(),
            )
        }
        Platform::Other => {
            return Err(ApiError::new(
                rid,
                "validation_error",
                "OTHER does not support OAuth linking",
            ))
        }
    };

    let row = klip_db::accounts::upsert_oauth_account(
        &state.pool,
        &NewOAuthAccount {
            user_id: user.user_id,
            platform: body.platform,
            handle,
            profile_url,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_expires_at,
            verification_note: note,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(rid.clone()),
    }))
}
