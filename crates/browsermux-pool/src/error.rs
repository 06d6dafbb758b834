use std::path::PathBuf;

use thiserror::Error;

/// Errors from the process pool and its resources.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No free debug ports remain in the configured range.
    #[error("debug port pool exhausted")]
    PoolExhausted,

    /// A port was released (or requested) that this pool does not currently
    /// track as allocated. Always a programming error in the caller.
    #[error("port {0} is outside the pool range or not in the expected state")]
    InvalidPort(u16),

    #[error("browser binary not found at {0}")]
    BinaryNotFound(PathBuf),

    #[error("browser binary found but not executable: {0}")]
    BinaryNotExecutable(PathBuf),

    /// The subprocess could not be launched. Port and scratch directory have
    /// already been released when this is returned.
    #[error("failed to spawn browser process: {0}")]
    SpawnFailed(String),

    /// The pool holds no live processes to place a session on.
    #[error("no browser process available")]
    NoProcessAvailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
