//! High-level command wrappers.
//!
//! Each wrapper shapes `params`, issues one (or a small fixed number of)
//! commands, and parses a single well-known field out of the result.
//! Target-scoped commands go through a flat-protocol attachment: the client
//! keeps a `target id → session id` cache populated by
//! `Target.attachToTarget {flatten: true}` and dropped on `close_target`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use crate::client::ControlClient;
use crate::error::CdpError;
use crate::protocol::VersionInfo;

impl ControlClient {
    /// Create a new isolated browser context.
    pub async fn create_browser_context(&self) -> Result<String, CdpError> {
        let result = self.send_command("Target.createBrowserContext", None).await?;
        string_field(&result, "browserContextId")
    }

    /// Dispose a browser context and every target inside it.
    pub async fn dispose_browser_context(&self, context_id: &str) -> Result<(), CdpError> {
        self.send_command(
            "Target.disposeBrowserContext",
            Some(json!({ "browserContextId": context_id })),
        )
        .await?;
        Ok(())
    }

    /// Create a page inside the given context. The browser navigates to
    /// `url` as part of target creation; this returns as soon as the target
    /// id is allocated, without waiting for the load to finish.
    pub async fn create_target(&self, url: &str, context_id: &str) -> Result<String, CdpError> {
        let mut params = json!({ "url": url });
        if !context_id.is_empty() {
            params["browserContextId"] = json!(context_id);
        }
        let result = self.send_command("Target.createTarget", Some(params)).await?;
        string_field(&result, "targetId")
    }

    /// Close a page.
    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.attached.lock().remove(target_id);
        self.send_command("Target.closeTarget", Some(json!({ "targetId": target_id })))
            .await?;
        Ok(())
    }

    /// Browser version and protocol information.
    pub async fn get_version(&self) -> Result<VersionInfo, CdpError> {
        let result = self.send_command("Browser.getVersion", None).await?;
        serde_json::from_value(result)
            .map_err(|err| CdpError::InvalidResponse(format!("Browser.getVersion: {err}")))
    }

    /// Navigate an existing page to a new URL.
    pub async fn navigate(&self, target_id: &str, url: &str) -> Result<String, CdpError> {
        let session = self.ensure_attached(target_id).await?;
        let result = self
            .send("Page.navigate", Some(json!({ "url": url })), Some(&session))
            .await?;

        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            if !error_text.is_empty() {
                return Err(CdpError::NavigationFailed(error_text.to_string()));
            }
        }
        string_field(&result, "frameId")
    }

    /// Evaluate a script in the page and return its decoded value.
    pub async fn evaluate(&self, target_id: &str, script: &str) -> Result<Value, CdpError> {
        let session = self.ensure_attached(target_id).await?;
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": script,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
                Some(&session),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .or_else(|| exception.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("unknown evaluation error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Capture a PNG screenshot of the page, decoded to raw bytes.
    pub async fn capture_screenshot(&self, target_id: &str) -> Result<Vec<u8>, CdpError> {
        let session = self.ensure_attached(target_id).await?;
        let result = self
            .send(
                "Page.captureScreenshot",
                Some(json!({ "format": "png" })),
                Some(&session),
            )
            .await?;

        let data = string_field(&result, "data")?;
        BASE64
            .decode(data)
            .map_err(|err| CdpError::InvalidResponse(format!("screenshot payload: {err}")))
    }

    /// Outer HTML of the page's root document.
    pub async fn get_outer_html(&self, target_id: &str) -> Result<String, CdpError> {
        let session = self.ensure_attached(target_id).await?;

        let document = self
            .send("DOM.getDocument", Some(json!({ "depth": 0 })), Some(&session))
            .await?;
        let node_id = document
            .get("root")
            .and_then(|root| root.get("nodeId"))
            .and_then(Value::as_i64)
            .ok_or_else(|| CdpError::InvalidResponse("missing `root.nodeId` in result".into()))?;

        let html = self
            .send(
                "DOM.getOuterHTML",
                Some(json!({ "nodeId": node_id })),
                Some(&session),
            )
            .await?;
        string_field(&html, "outerHTML")
    }

    /// Attach to a target with the flat protocol, reusing a cached session
    /// id when one exists.
    async fn ensure_attached(&self, target_id: &str) -> Result<String, CdpError> {
        if let Some(session) = self.attached.lock().get(target_id).cloned() {
            return Ok(session);
        }

        let result = self
            .send_command(
                "Target.attachToTarget",
                Some(json!({ "targetId": target_id, "flatten": true })),
            )
            .await?;
        let session = string_field(&result, "sessionId")?;

        self.attached
            .lock()
            .insert(target_id.to_string(), session.clone());
        Ok(session)
    }
}

fn string_field(value: &Value, field: &str) -> Result<String, CdpError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CdpError::InvalidResponse(format!("missing `{field}` in result")))
}
