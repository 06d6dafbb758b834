//! The multiplexed control-protocol client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::error::CdpError;
use crate::protocol::{BrowserVersion, CommandFrame, ResponseFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Wall-clock ceiling on a single command round trip.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Single-slot waiter a caller blocks on until its response arrives.
type Waiter = oneshot::Sender<Result<Value, CdpError>>;

type WaiterMap = Arc<Mutex<HashMap<u64, Waiter>>>;

/// Query the browser's HTTP discovery endpoint for its WebSocket URL.
pub async fn discover_ws_url(host: &str, port: u16) -> Result<String, CdpError> {
    let url = format!("http://{host}:{port}/json/version");
    let version: BrowserVersion = reqwest::get(&url)
        .await
        .map_err(|err| CdpError::ConnectFailed(format!("discovery at {url}: {err}")))?
        .json()
        .await
        .map_err(|err| CdpError::ConnectFailed(format!("discovery at {url}: {err}")))?;
    Ok(version.web_socket_debugger_url)
}

/// One persistent full-duplex connection to a browser, shared by every
/// session placed on that browser.
///
/// Correlation contract: request ids are unique and strictly increasing for
/// the life of the client; every id registered in the waiter map is removed
/// exactly once — by its response, its timeout, or client close. Events
/// never satisfy waiters.
pub struct ControlClient {
    ws_url: String,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    next_id: AtomicU64,
    pending: WaiterMap,
    /// Flat-protocol attachments: target id → CDP session id.
    pub(crate) attached: Mutex<HashMap<String, String>>,
    cancel: CancellationToken,
    closed: AtomicBool,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl ControlClient {
    /// Create a client for the given WebSocket URL. Does not connect.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            sink: tokio::sync::Mutex::new(None),
            next_id: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(HashMap::new())),
            attached: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
            receiver: Mutex::new(None),
        }
    }

    /// Open the connection and start the background receiver.
    pub async fn connect(&self) -> Result<(), CdpError> {
        debug!(url = %self.ws_url, "connecting control client");
        let (stream, _) = tokio_tungstenite::connect_async(&self.ws_url)
            .await
            .map_err(|err| CdpError::ConnectFailed(err.to_string()))?;

        let (sink, source) = stream.split();
        *self.sink.lock().await = Some(sink);

        let pending = self.pending.clone();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(receive_loop(source, pending, cancel));
        *self.receiver.lock() = Some(handle);

        debug!(url = %self.ws_url, "control client connected");
        Ok(())
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Whether `close` has run or the receiver has torn the client down.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }

    /// Send a command and wait for its response.
    pub async fn send_command(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, CdpError> {
        self.send(method, params, None).await
    }

    /// Send a command, optionally scoped to a flat-protocol session.
    pub(crate) async fn send(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        if self.is_closed() {
            return Err(CdpError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = CommandFrame {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };
        let payload = serde_json::to_string(&frame)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        trace!(id, method, "sending command");

        {
            let mut sink = self.sink.lock().await;
            let Some(sink) = sink.as_mut() else {
                self.pending.lock().remove(&id);
                return Err(CdpError::Closed);
            };
            if let Err(err) = sink.send(Message::Text(payload.into())).await {
                self.pending.lock().remove(&id);
                return Err(CdpError::Transport(err.to_string()));
            }
        }

        tokio::select! {
            outcome = rx => match outcome {
                Ok(result) => result,
                // Waiter dropped without a send: the client tore down.
                Err(_) => Err(CdpError::Closed),
            },
            _ = tokio::time::sleep(COMMAND_TIMEOUT) => {
                self.pending.lock().remove(&id);
                warn!(id, method, "command timed out");
                Err(CdpError::Timeout(COMMAND_TIMEOUT.as_secs()))
            }
            _ = self.cancel.cancelled() => {
                self.pending.lock().remove(&id);
                Err(CdpError::Closed)
            }
        }
    }

    /// Tear the client down: stop the receiver, close the socket, and fail
    /// every outstanding waiter with [`CdpError::Closed`]. One-shot and
    /// idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(url = %self.ws_url, "closing control client");

        self.cancel.cancel();

        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.close().await;
        }

        let receiver = self.receiver.lock().take();
        if let Some(handle) = receiver {
            let _ = handle.await;
        }

        fail_pending(&self.pending);
        self.attached.lock().clear();
    }
}

/// Fail every outstanding waiter with `Closed`.
fn fail_pending(pending: &WaiterMap) {
    let drained: Vec<Waiter> = {
        let mut map = pending.lock();
        map.drain().map(|(_, waiter)| waiter).collect()
    };
    for waiter in drained {
        let _ = waiter.send(Err(CdpError::Closed));
    }
}

/// Background receiver: reads frames until cancellation or socket error.
async fn receive_loop(mut source: WsSource, pending: WaiterMap, cancel: CancellationToken) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = source.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => dispatch_frame(text.as_str(), &pending),
            Some(Ok(Message::Close(_))) => {
                debug!("browser closed the control socket");
                break;
            }
            // Pings are answered by the websocket layer; binary is not part
            // of the protocol.
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                if cancel.is_cancelled() {
                    break;
                }
                error!(error = %err, "control socket read failed");
                break;
            }
            None => {
                debug!("control socket stream ended");
                break;
            }
        }
    }

    // An abnormal exit (browser crash, socket error) must not strand
    // callers: wake everyone with Closed and make future sends fail fast.
    if !cancel.is_cancelled() {
        cancel.cancel();
        fail_pending(&pending);
    }
    debug!("receiver stopped");
}

/// Route one inbound frame to its waiter, or log it as an event.
fn dispatch_frame(text: &str, pending: &WaiterMap) {
    let frame: ResponseFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "failed to parse inbound frame");
            return;
        }
    };

    match frame.response_id() {
        Some(id) => {
            let waiter = pending.lock().remove(&id);
            match waiter {
                Some(waiter) => {
                    let outcome = match frame.error {
                        Some(remote) => Err(CdpError::Remote {
                            code: remote.code,
                            message: remote.message,
                        }),
                        None => Ok(frame.result.unwrap_or(Value::Null)),
                    };
                    // A dropped receiver means the caller already timed out.
                    let _ = waiter.send(outcome);
                }
                None => warn!(id, "dropping response with no waiter"),
            }
        }
        None => {
            let method = frame.method.as_deref().unwrap_or("<unknown>");
            debug!(method, "browser event");
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
