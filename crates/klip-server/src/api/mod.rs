mod accounts;
mod campaigns;
mod dashboard;
mod integrations;
mod submissions;
mod sweeps;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use klip_core::AppConfig;
use klip_providers::{OAuthClient, ProfileClient, ProviderError, ProviderRegistry};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, user_context_from_headers, AuthState,
    RateLimitState, RequestId, UserContext,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub registry: ProviderRegistry,
    pub oauth: Arc<OAuthClient>,
    pub profile: Arc<ProfileClient>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" | "verification_failed"
            | "token_exchange_failed" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Resolves the gateway-injected caller identity, or answers 401.
pub(super) fn require_user(request_id: &str, headers: &HeaderMap) -> Result<UserContext, ApiError> {
    user_context_from_headers(headers).ok_or_else(|| {
        ApiError::new(
            request_id,
            "unauthorized",
            "missing or invalid x-user-id header",
        )
    })
}

/// As [`require_user`], additionally requiring the admin role.
pub(super) fn require_admin(request_id: &str, headers: &HeaderMap) -> Result<UserContext, ApiError> {
    let user = require_user(request_id, headers)?;
    if !user.is_admin {
        return Err(ApiError::new(
            request_id,
            "forbidden",
            "administrator role required",
        ));
    }
    Ok(user)
}

pub(super) fn map_db_error(request_id: String, error: &klip_db::DbError) -> ApiError {
    if matches!(error, klip_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Maps a unique-constraint violation to a 409 with the given message;
/// everything else falls through to [`map_db_error`].
pub(super) fn map_conflict(
    request_id: &str,
    error: &klip_db::DbError,
    conflict_message: &str,
) -> ApiError {
    if error.is_unique_violation() {
        return ApiError::new(request_id, "conflict", conflict_message);
    }
    map_db_error(request_id.to_owned(), error)
}

/// Maps provider-layer failures to the API taxonomy. Missing server
/// credentials are the one category that surfaces as a hard 5xx — they
/// indicate a deployment defect, not transient external unavailability.
pub(super) fn map_provider_error(request_id: &str, error: &ProviderError) -> ApiError {
    match error {
        ProviderError::MissingCredential {
            platform,
            credential,
        } => {
            tracing::error!(platform, credential, "missing server credential");
            ApiError::new(
                request_id,
                "config_error",
                format!("server credential {credential} is not configured"),
            )
        }
        ProviderError::TokenExchange { platform, detail } => ApiError::new(
            request_id,
            "token_exchange_failed",
            format!("{platform} authorization failed: {detail}"),
        ),
        ProviderError::Unsupported {
            platform,
            operation,
        } => ApiError::new(
            request_id,
            "validation_error",
            format!("{platform} does not support {operation}"),
        ),
        other => {
            tracing::warn!(error = %other, "provider call failed");
            ApiError::new(request_id, "upstream_error", "platform API unavailable")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-user-role"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/api/v1/accounts/manual-link",
            post(accounts::manual_link),
        )
        .route(
            "/api/v1/accounts/{id}/metrics",
            get(accounts::account_metrics),
        )
        .route(
            "/api/v1/accounts/{id}/content-metrics",
            get(accounts::account_content_metrics),
        )
        .route(
            "/api/v1/accounts/{id}/verify-bio",
            post(accounts::verify_bio),
        )
        .route(
            "/api/v1/accounts/{id}/verify",
            patch(accounts::admin_verify),
        )
        .route(
            "/api/v1/integrations/{platform}/connect",
            get(integrations::connect_url),
        )
        .route(
            "/api/v1/integrations/oauth/exchange",
            post(integrations::oauth_exchange),
        )
        .route(
            "/api/v1/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route("/api/v1/campaigns/{id}", get(campaigns::get_campaign))
        .route("/api/v1/campaigns/{id}/join", post(campaigns::join_campaign))
        .route(
            "/api/v1/campaigns/{id}/memberships/{user_id}",
            patch(campaigns::set_membership),
        )
        .route(
            "/api/v1/submissions",
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route(
            "/api/v1/submissions/{id}/approve",
            post(submissions::approve_submission),
        )
        .route(
            "/api/v1/submissions/{id}/reject",
            post(submissions::reject_submission),
        )
        .route(
            "/api/v1/submissions/{id}/analytics",
            get(submissions::submission_analytics),
        )
        .route(
            "/api/v1/dashboard/creator",
            get(dashboard::creator_dashboard),
        )
        .route("/api/v1/dashboard/admin", get(dashboard::admin_dashboard))
        .route("/api/v1/sweeps/accounts", post(sweeps::sweep_accounts))
        .route(
            "/api/v1/sweeps/submissions",
            post(sweeps::sweep_submissions),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match klip_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
