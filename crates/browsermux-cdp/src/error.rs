use thiserror::Error;

/// Control-protocol client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// WebSocket discovery or connection failed.
    #[error("failed to connect to browser: {0}")]
    ConnectFailed(String),

    /// The socket write or read failed mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response arrived within the command deadline.
    #[error("command timed out after {0} seconds")]
    Timeout(u64),

    /// The client was closed while the call was pending, or the call was
    /// issued against an already closed client.
    #[error("client closed")]
    Closed,

    /// The browser answered with an error payload; surfaced verbatim.
    #[error("browser returned error {code}: {message}")]
    Remote { code: i64, message: String },

    /// Navigation reported an error text.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// Script evaluation threw.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("failed to encode command: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The response arrived but is missing an expected field.
    #[error("malformed response: {0}")]
    InvalidResponse(String),
}
