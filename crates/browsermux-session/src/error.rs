use thiserror::Error;

use browsermux_cdp::CdpError;
use browsermux_pool::PoolError;

/// Session-layer errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("page not found in session: {0}")]
    PageNotFound(String),

    #[error("browser pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("control protocol error: {0}")]
    Control(#[from] CdpError),

    #[error("failed to parse page analysis: {0}")]
    Analysis(String),
}
