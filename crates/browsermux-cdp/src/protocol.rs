//! DevTools protocol frame types.
//!
//! Outbound frames carry `{id, method, params}`; inbound frames are either a
//! response (`{id, result|error}`) or an event (`{method, params}` with no
//! id). Parsing is deliberately lenient — every field is optional and
//! unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command sent to the browser.
#[derive(Debug, Serialize)]
pub struct CommandFrame {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Flat-protocol session id for target-scoped commands.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Any inbound frame: response when `id` is present and non-zero, event
/// otherwise.
#[derive(Debug, Deserialize)]
pub struct ResponseFrame {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RemoteError>,
    pub method: Option<String>,
    #[allow(dead_code)]
    pub params: Option<Value>,
}

impl ResponseFrame {
    /// The request id this frame answers, if it is a response at all.
    pub fn response_id(&self) -> Option<u64> {
        self.id.filter(|&id| id != 0)
    }
}

/// Error payload inside a response frame.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
}

/// Subset of the `/json/version` discovery document.
///
/// Chrome capitalizes most of these keys.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Result of `Browser.getVersion`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub protocol_version: String,
    pub product: String,
    pub revision: String,
    pub user_agent: String,
    pub js_version: String,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
