use std::sync::Arc;

use browsermux_pool::ProcessPool;
use browsermux_session::SessionManager;

/// Shared state for all handlers.
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub pool: Arc<ProcessPool>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>, pool: Arc<ProcessPool>) -> Self {
        Self { manager, pool }
    }
}
