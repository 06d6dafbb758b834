use std::path::PathBuf;

use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("browser binary not found at {0}")]
    BinaryNotFound(PathBuf),

    #[error("browser binary found but not executable: {0}")]
    BinaryNotExecutable(PathBuf),

    #[error("no browser binary found in common install locations; set BROWSER_BINARY_PATH")]
    BinaryNotDetected,

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}
