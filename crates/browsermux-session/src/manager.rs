//! The session manager.
//!
//! Holds `session id → session` and `process port → control client` behind
//! one readers-writer lock. Clients are shared: every session placed on a
//! process reuses that process's connection, and the client outlives any
//! individual session. Lock order, where nesting is unavoidable, is always
//! manager → pool, never the reverse.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::RngCore;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use browsermux_cdp::{discover_ws_url, CdpError, ControlClient};
use browsermux_pool::{LoadBalancer, ProcessPool};

use crate::analyzer::{parse_structure, PageStructure, PAGE_ANALYZER_JS};
use crate::error::SessionError;
use crate::session::{Session, SessionInfo, SessionStatus};

/// Browsers only listen on loopback.
const BROWSER_HOST: &str = "127.0.0.1";

struct Inner {
    sessions: HashMap<String, Session>,
    clients: HashMap<u16, Arc<ControlClient>>,
}

/// Maps external session identities onto isolated browser contexts and the
/// shared control clients serving them.
pub struct SessionManager {
    inner: RwLock<Inner>,
    pool: Arc<ProcessPool>,
    balancer: LoadBalancer,
}

impl SessionManager {
    pub fn new(pool: Arc<ProcessPool>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                sessions: HashMap::new(),
                clients: HashMap::new(),
            }),
            balancer: LoadBalancer::new(pool.clone()),
            pool,
        }
    }

    /// Create an isolated session. When `port` is `None` the least-loaded
    /// browser process is chosen.
    pub async fn create_session(&self, port: Option<u16>) -> Result<SessionInfo, SessionError> {
        let port = match port {
            Some(port) => port,
            None => self.balancer.pick().await?,
        };

        let mut inner = self.inner.write().await;
        let session_id = generate_session_id();
        let client = self.client_for_port(&mut inner, port).await?;

        // On failure the client stays registered — other sessions may be
        // using it.
        let context_id = client.create_browser_context().await?;

        let session = Session::new(session_id.clone(), port, context_id, client);
        let info = session.info();
        inner.sessions.insert(session_id.clone(), session);
        drop(inner);

        if let Some(process) = self.pool.find(port).await {
            process.increment_sessions();
        }

        info!(session_id, port, "session created");
        Ok(info)
    }

    /// Resolve the shared client for a port, connecting lazily on first use.
    /// A client whose connection has died (crashed browser, since replaced)
    /// is discarded and re-established.
    async fn client_for_port(
        &self,
        inner: &mut Inner,
        port: u16,
    ) -> Result<Arc<ControlClient>, SessionError> {
        if let Some(client) = inner.clients.get(&port) {
            if !client.is_closed() {
                return Ok(client.clone());
            }
            debug!(port, "discarding dead control client");
            inner.clients.remove(&port);
        }

        let ws_url = discover_ws_url(BROWSER_HOST, port).await?;
        let client = Arc::new(ControlClient::new(ws_url));
        client.connect().await?;
        inner.clients.insert(port, client.clone());
        Ok(client)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionInfo, SessionError> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(session_id)
            .map(Session::info)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        self.inner
            .read()
            .await
            .sessions
            .values()
            .map(Session::info)
            .collect()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Tear a session down: close its pages (best effort), dispose its
    /// context, decrement the owning process's counter, and drop the
    /// record. A second call reports `SessionNotFound`.
    pub async fn destroy_session(&self, session_id: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.write().await;
        let (client, pages, context_id, port) = {
            let session = inner
                .sessions
                .get(session_id)
                .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
            (
                session.client.clone(),
                session.page_ids.clone(),
                session.context_id.clone(),
                session.process_port,
            )
        };

        for page_id in &pages {
            if let Err(err) = client.close_target(page_id).await {
                warn!(session_id, page_id, error = %err, "failed to close page during destroy");
            }
        }

        match client.dispose_browser_context(&context_id).await {
            Ok(()) => {
                if let Some(process) = self.pool.find(port).await {
                    process.decrement_sessions();
                }
            }
            // The connection died: the browser crashed and was replaced, so
            // the context is already gone and the replacement's counter
            // never included this session. Reap the record.
            Err(CdpError::Closed | CdpError::Transport(_)) => {
                warn!(session_id, port, "connection lost, reaping orphaned session record");
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(session) = inner.sessions.get_mut(session_id) {
            session.status = SessionStatus::Closed;
        }
        inner.sessions.remove(session_id);

        info!(session_id, "session destroyed");
        Ok(())
    }

    /// Close every control client and drop all state.
    pub async fn close(&self) {
        let mut inner = self.inner.write().await;
        for (port, client) in inner.clients.drain() {
            debug!(port, "closing control client");
            client.close().await;
        }
        inner.sessions.clear();
        info!("session manager closed");
    }

    /// Open a page inside the session's context. The browser starts loading
    /// `url` during target creation; this returns the page id without
    /// waiting for the load to finish.
    pub async fn navigate(&self, session_id: &str, url: &str) -> Result<String, SessionError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        session.touch();

        let client = session.client.clone();
        let context_id = session.context_id.clone();
        let page_id = client.create_target(url, &context_id).await?;
        session.add_page(page_id.clone());

        debug!(session_id, page_id, url, "page opened");
        Ok(page_id)
    }

    /// Evaluate a script in one of the session's pages.
    pub async fn execute_js(
        &self,
        session_id: &str,
        page_id: &str,
        script: &str,
    ) -> Result<Value, SessionError> {
        let client = self.page_client(session_id, page_id).await?;
        Ok(client.evaluate(page_id, script).await?)
    }

    /// Raw PNG bytes of the page.
    pub async fn capture_screenshot(
        &self,
        session_id: &str,
        page_id: &str,
    ) -> Result<Vec<u8>, SessionError> {
        let client = self.page_client(session_id, page_id).await?;
        Ok(client.capture_screenshot(page_id).await?)
    }

    /// Outer HTML of the page's root document.
    pub async fn get_page_content(
        &self,
        session_id: &str,
        page_id: &str,
    ) -> Result<String, SessionError> {
        let client = self.page_client(session_id, page_id).await?;
        Ok(client.get_outer_html(page_id).await?)
    }

    /// Close a page and stop tracking it.
    pub async fn close_page(&self, session_id: &str, page_id: &str) -> Result<(), SessionError> {
        let client = self.page_client(session_id, page_id).await?;
        client.close_target(page_id).await?;

        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.get_mut(session_id) {
            session.remove_page(page_id);
        }
        debug!(session_id, page_id, "page closed");
        Ok(())
    }

    /// Structural snapshot of a page, served from the per-session cache
    /// when one exists.
    pub async fn analyze_page(
        &self,
        session_id: &str,
        page_id: &str,
    ) -> Result<PageStructure, SessionError> {
        let client = {
            let mut inner = self.inner.write().await;
            let session = inner
                .sessions
                .get_mut(session_id)
                .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
            session.touch();
            if !session.has_page(page_id) {
                return Err(SessionError::PageNotFound(page_id.to_string()));
            }
            if let Some(cached) = session.analysis_cache.get(page_id) {
                debug!(session_id, page_id, "serving cached page analysis");
                return Ok(cached.clone());
            }
            session.client.clone()
        };

        let value = client.evaluate(page_id, PAGE_ANALYZER_JS).await?;
        let structure = parse_structure(page_id, value)?;

        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.get_mut(session_id) {
            session
                .analysis_cache
                .insert(page_id.to_string(), structure.clone());
        }
        Ok(structure)
    }

    /// Drop the cached analysis for one page.
    pub async fn invalidate_analysis(
        &self,
        session_id: &str,
        page_id: &str,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        session.analysis_cache.remove(page_id);
        Ok(())
    }

    /// Drop every cached analysis for a session.
    pub async fn invalidate_all_analysis(&self, session_id: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        session.analysis_cache.clear();
        Ok(())
    }

    /// Common preamble for page-scoped operations: look the session up,
    /// bump last-activity, check page membership, and hand back the shared
    /// client so the browser round trip runs without the manager lock held.
    async fn page_client(
        &self,
        session_id: &str,
        page_id: &str,
    ) -> Result<Arc<ControlClient>, SessionError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        session.touch();
        if !session.has_page(page_id) {
            return Err(SessionError::PageNotFound(page_id.to_string()));
        }
        Ok(session.client.clone())
    }
}

/// `sess_` plus 16 cryptographically random bytes, URL-safe base64 encoded.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    format!("sess_{}", URL_SAFE.encode(bytes))
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
