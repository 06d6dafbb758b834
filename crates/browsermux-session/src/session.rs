//! The session record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use browsermux_cdp::ControlClient;

use crate::analyzer::PageStructure;

/// Current state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The context exists inside the browser and accepts operations.
    Active,
    /// Explicitly destroyed.
    Closed,
    /// Idle past the inactivity deadline.
    Expired,
}

/// An isolated browsing session: one browser context on one pooled process.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    /// Port of the owning browser process; the manager resolves this to the
    /// shared control client, so the session never owns a connection.
    pub process_port: u16,
    /// Browser context backing this session's isolation.
    pub context_id: String,
    /// Pages opened inside the context, in creation order.
    pub page_ids: Vec<String>,
    pub client: Arc<ControlClient>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub status: SessionStatus,
    /// Most recent structural snapshot per page.
    pub(crate) analysis_cache: HashMap<String, PageStructure>,
}

impl Session {
    pub fn new(id: String, process_port: u16, context_id: String, client: Arc<ControlClient>) -> Self {
        let now = Utc::now();
        Self {
            id,
            process_port,
            context_id,
            page_ids: Vec::new(),
            client,
            created_at: now,
            last_activity: now,
            status: SessionStatus::Active,
            analysis_cache: HashMap::new(),
        }
    }

    /// Refresh the last-activity instant.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Track a newly created page.
    pub fn add_page(&mut self, page_id: String) {
        self.page_ids.push(page_id);
        self.touch();
    }

    /// Stop tracking a page and drop its cached analysis.
    pub fn remove_page(&mut self, page_id: &str) {
        self.page_ids.retain(|id| id != page_id);
        self.analysis_cache.remove(page_id);
        self.touch();
    }

    pub fn has_page(&self, page_id: &str) -> bool {
        self.page_ids.iter().any(|id| id == page_id)
    }

    /// Whether the session has been idle longer than `timeout`.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        Utc::now() - self.last_activity > timeout
    }

    /// Serializable snapshot for API consumers.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            context_id: self.context_id.clone(),
            page_ids: self.page_ids.clone(),
            page_count: self.page_ids.len(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            status: self.status,
        }
    }
}

/// Client-facing view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub context_id: String,
    pub page_ids: Vec<String>,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub status: SessionStatus,
}
