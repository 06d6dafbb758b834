//! Chrome DevTools Protocol client.
//!
//! One [`ControlClient`] per browser process holds a single persistent
//! WebSocket carrying many in-flight request/response pairs plus unsolicited
//! events. Requests are correlated to responses by a strictly increasing
//! integer id; callers block on a single-slot waiter until the response
//! arrives, a 10-second timeout fires, or the client is closed.

mod client;
mod commands;
mod error;
mod protocol;

pub use client::{discover_ws_url, ControlClient};
pub use error::CdpError;
pub use protocol::{BrowserVersion, CommandFrame, RemoteError, ResponseFrame, VersionInfo};
