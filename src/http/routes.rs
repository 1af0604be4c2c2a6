//! Request handlers.

use super::error::{ApiError, Stage};
use super::gate::basic_credential;
use super::AppState;
use crate::access::{ResourcePermission, decode_claim};
use crate::auth::{Identity, TokenPair};
use crate::error::AuthError;
use crate::telemetry::{RequestTimer, spans};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    pub device: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub device: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub identity: Identity,
    pub permissions: Vec<PermissionView>,
}

#[derive(Debug, Serialize)]
pub struct PermissionView {
    pub resource: String,
    pub read: bool,
    pub write: bool,
}

impl From<ResourcePermission> for PermissionView {
    fn from(p: ResourcePermission) -> Self {
        Self {
            resource: p.resource,
            read: p.readable,
            write: p.writable,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub user_id: i64,
    pub devices: Vec<String>,
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DeviceRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let _timer = RequestTimer::new("login");
    let span = spans::login(&body.device);

    async {
        let raw = basic_credential(&headers)
            .ok_or_else(|| state.reject(AuthError::MissingToken, Stage::Credential))?;

        let accounts = state.db.accounts();
        let identity = state
            .credentials
            .verify(raw, &accounts)
            .await
            .map_err(|e| state.reject(e, Stage::Credential))?;

        accounts
            .touch_login(identity.user_id)
            .await
            .map_err(|e| state.reject(e.into(), Stage::Credential))?;

        let pair = state
            .issuer
            .issue_for_role(&identity, &body.device)
            .await
            .map_err(|e| state.reject(e, Stage::Credential))?;
        Ok::<_, ApiError>(Json(pair))
    }
    .instrument(span)
    .await
}

/// `POST /auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let _timer = RequestTimer::new("refresh");
    let span = spans::refresh(&body.device);

    state
        .rotator
        .rotate(&body.refresh_token, &body.device)
        .instrument(span)
        .await
        .map(Json)
        .map_err(|e| state.reject(e, Stage::Refresh))
}

/// `POST /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DeviceRequest>,
) -> Result<StatusCode, ApiError> {
    let _timer = RequestTimer::new("logout");
    let identity = state
        .routes
        .logout
        .authorize(&headers)
        .map_err(|e| state.reject(e, Stage::Token))?;

    state
        .rotator
        .revoke(identity.user_id, &body.device)
        .instrument(spans::request("logout", Some(identity.user_id)))
        .await
        .map_err(|e| state.reject(e, Stage::Token))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/me`
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<MeResponse>, ApiError> {
    let _timer = RequestTimer::new("me");
    let access = state
        .routes
        .me
        .authorize_access(&headers)
        .map_err(|e| state.reject(e, Stage::Token))?;

    let permissions = decode_claim(&access.capabilities)
        .into_iter()
        .map(PermissionView::from)
        .collect();
    Ok(Json(MeResponse {
        identity: access.identity,
        permissions,
    }))
}

/// `GET /auth/sessions/{user_id}`
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SessionsResponse>, ApiError> {
    let _timer = RequestTimer::new("list_sessions");
    let caller = state
        .routes
        .list_sessions
        .authorize(&headers)
        .map_err(|e| state.reject(e, Stage::Token))?;

    let devices = async {
        let mut conn = state.db.pool().acquire().await?;
        let devices = crate::db::sessions::devices(&mut conn, user_id).await?;
        Ok::<_, AuthError>(devices)
    }
    .instrument(spans::request("list_sessions", Some(caller.user_id)))
    .await
    .map_err(|e| state.reject(e, Stage::Token))?;

    Ok(Json(SessionsResponse { user_id, devices }))
}

/// `DELETE /auth/sessions/{user_id}/{device}`
pub async fn revoke_session(
    State(state): State<AppState>,
    Path((user_id, device)): Path<(i64, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let _timer = RequestTimer::new("revoke_session");
    let caller = state
        .routes
        .revoke_session
        .authorize(&headers)
        .map_err(|e| state.reject(e, Stage::Token))?;

    let revoked = state
        .rotator
        .revoke(user_id, &device)
        .instrument(spans::request("revoke_session", Some(caller.user_id)))
        .await
        .map_err(|e| state.reject(e, Stage::Token))?;

    Ok(if revoked {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    })
}

/// `GET /metrics`
pub async fn metrics() -> String {
    crate::metrics::gather_metrics()
}
