//! Request handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use browsermux_session::{PageStructure, SessionInfo};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub browser_port: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub context_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionInfo>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub session_id: String,
    pub page_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub page_id: String,
    #[serde(default)]
    pub script: String,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub session_id: String,
    pub page_id: String,
    pub result: Value,
}

#[derive(Debug, Deserialize)]
pub struct ScreenshotRequest {
    #[serde(default)]
    pub page_id: String,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScreenshotResponse {
    pub session_id: String,
    pub page_id: String,
    /// Base64-encoded image bytes.
    pub screenshot: String,
    pub format: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct PageContentResponse {
    pub session_id: String,
    pub page_id: String,
    pub content: String,
    pub length: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub pool: browsermux_pool::PoolMetrics,
}

/// POST /sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    // An absent or empty body simply means "let the balancer place it".
    let request = body.map(|Json(req)| req).unwrap_or_default();

    let info = state
        .manager
        .create_session(request.browser_port.filter(|&port| port != 0))
        .await
        .map_err(|err| ApiError::from_session(err, "SessionCreateFailed"))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: info.session_id,
            context_id: info.context_id,
            created_at: info.created_at,
        }),
    ))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<ListSessionsResponse> {
    let sessions = state.manager.list_sessions().await;
    let count = sessions.len();
    Json(ListSessionsResponse { sessions, count })
}

/// GET /sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    let info = state
        .manager
        .get_session(&session_id)
        .await
        .map_err(|err| ApiError::from_session(err, "InternalError"))?;
    Ok(Json(info))
}

/// DELETE /sessions/{id}
pub async fn destroy_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .destroy_session(&session_id)
        .await
        .map_err(|err| ApiError::from_session(err, "InternalError"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/{id}/navigate
pub async fn navigate(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, ApiError> {
    if request.url.is_empty() {
        return Err(ApiError::bad_request("url is required"));
    }

    let page_id = state
        .manager
        .navigate(&session_id, &request.url)
        .await
        .map_err(|err| ApiError::from_session(err, "NavigationFailed"))?;

    Ok(Json(NavigateResponse {
        session_id,
        page_id,
        url: request.url,
    }))
}

/// POST /sessions/{id}/execute
pub async fn execute_js(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    if request.page_id.is_empty() {
        return Err(ApiError::bad_request("page_id is required"));
    }
    if request.script.is_empty() {
        return Err(ApiError::bad_request("script is required"));
    }

    let result = state
        .manager
        .execute_js(&session_id, &request.page_id, &request.script)
        .await
        .map_err(|err| ApiError::from_session(err, "ExecutionFailed"))?;

    Ok(Json(ExecuteResponse {
        session_id,
        page_id: request.page_id,
        result,
    }))
}

/// POST /sessions/{id}/screenshot
pub async fn capture_screenshot(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<ScreenshotRequest>,
) -> Result<Json<ScreenshotResponse>, ApiError> {
    if request.page_id.is_empty() {
        return Err(ApiError::bad_request("page_id is required"));
    }

    let bytes = state
        .manager
        .capture_screenshot(&session_id, &request.page_id)
        .await
        .map_err(|err| ApiError::from_session(err, "ScreenshotFailed"))?;

    Ok(Json(ScreenshotResponse {
        session_id,
        page_id: request.page_id,
        size: bytes.len(),
        screenshot: BASE64.encode(&bytes),
        format: request.format.unwrap_or_else(|| "png".to_string()),
    }))
}

/// GET /sessions/{id}/pages/{page_id}/content
pub async fn page_content(
    State(state): State<Arc<AppState>>,
    Path((session_id, page_id)): Path<(String, String)>,
) -> Result<Json<PageContentResponse>, ApiError> {
    let content = state
        .manager
        .get_page_content(&session_id, &page_id)
        .await
        .map_err(|err| ApiError::from_session(err, "InternalError"))?;

    Ok(Json(PageContentResponse {
        session_id,
        page_id,
        length: content.len(),
        content,
    }))
}

/// GET /sessions/{id}/pages/{page_id}/analyze
pub async fn analyze_page(
    State(state): State<Arc<AppState>>,
    Path((session_id, page_id)): Path<(String, String)>,
) -> Result<Json<PageStructure>, ApiError> {
    let structure = state
        .manager
        .analyze_page(&session_id, &page_id)
        .await
        .map_err(|err| ApiError::from_session(err, "InternalError"))?;
    Ok(Json(structure))
}

/// DELETE /sessions/{id}/pages/{page_id}
pub async fn close_page(
    State(state): State<Arc<AppState>>,
    Path((session_id, page_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .close_page(&session_id, &page_id)
        .await
        .map_err(|err| ApiError::from_session(err, "InternalError"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.manager.session_count().await,
        pool: state.pool.metrics().await,
    })
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
