//! Route definitions.
//!
//! ```text
//! /sessions
//!   POST   /sessions                                - create session
//!   GET    /sessions                                - list sessions
//!   GET    /sessions/{id}                           - session detail
//!   DELETE /sessions/{id}                           - destroy session
//!   POST   /sessions/{id}/navigate                  - open a page at a URL
//!   POST   /sessions/{id}/execute                   - evaluate JavaScript
//!   POST   /sessions/{id}/screenshot                - capture a page
//!   GET    /sessions/{id}/pages/{page_id}/content   - outer HTML
//!   GET    /sessions/{id}/pages/{page_id}/analyze   - structural snapshot
//!   DELETE /sessions/{id}/pages/{page_id}           - close a page
//!
//! /health - pool and session metrics
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use tracing::info;

use crate::handlers::{
    analyze_page, capture_screenshot, close_page, create_session, destroy_session, execute_js,
    get_session, health, list_sessions, navigate, page_content,
};
use crate::state::AppState;

/// Build the service router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let session_routes = Router::new()
        .route("/", post(create_session).get(list_sessions))
        .route("/{id}", get(get_session).delete(destroy_session))
        .route("/{id}/navigate", post(navigate))
        .route("/{id}/execute", post(execute_js))
        .route("/{id}/screenshot", post(capture_screenshot))
        .route("/{id}/pages/{page_id}/content", get(page_content))
        .route("/{id}/pages/{page_id}/analyze", get(analyze_page))
        .route("/{id}/pages/{page_id}", delete(close_page))
        .with_state(state.clone());

    let monitoring_routes = Router::new()
        .route("/health", get(health))
        .with_state(state);

    Router::new()
        .nest("/sessions", session_routes)
        .merge(monitoring_routes)
        .layer(middleware::from_fn(log_requests))
}

/// Log every request with its outcome and latency.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
