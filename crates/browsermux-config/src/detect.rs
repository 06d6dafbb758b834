//! Browser binary autodetection.

use std::path::PathBuf;

use tracing::debug;

use crate::error::ConfigError;

/// Well-known install locations for the current platform.
fn candidate_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        ]
    }

    #[cfg(target_os = "linux")]
    {
        vec![
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Vec::new()
    }
}

/// Search well-known locations for a usable browser binary.
pub fn find_browser_binary() -> Result<PathBuf, ConfigError> {
    for candidate in candidate_paths() {
        if candidate.is_file() && is_executable(&candidate) {
            debug!(path = %candidate.display(), "auto-detected browser binary");
            return Ok(candidate);
        }
    }
    Err(ConfigError::BinaryNotDetected)
}

/// Validate that an explicitly configured binary exists and is executable.
pub(crate) fn validate_binary(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::BinaryNotFound(path));
    }
    if !is_executable(&path) {
        return Err(ConfigError::BinaryNotExecutable(path));
    }
    Ok(path)
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &std::path::Path) -> bool {
    true
}
