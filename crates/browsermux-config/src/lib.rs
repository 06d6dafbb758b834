//! Service configuration loaded from the environment.
//!
//! Everything is driven by four variables:
//!
//! - `BROWSER_BINARY_PATH` — Chromium/Chrome binary. When unset, a
//!   platform-specific list of well-known install locations is searched.
//! - `SERVER_PORT` — HTTP listen port (default 8080).
//! - `MAX_BROWSERS` — browser pool capacity (default 5).
//! - `ENV` — `production` switches console logging to JSON.

mod detect;
mod error;

use std::path::PathBuf;

pub use detect::find_browser_binary;
pub use error::ConfigError;

/// Default HTTP listen port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default browser pool capacity.
pub const DEFAULT_MAX_BROWSERS: usize = 5;

/// Runtime environment, only affects logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeEnv {
    #[default]
    Development,
    Production,
}

impl RuntimeEnv {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Validated path to the browser binary.
    pub browser_binary: PathBuf,
    /// HTTP listen port.
    pub server_port: u16,
    /// Number of browser processes kept in the pool.
    pub max_browsers: usize,
    /// Runtime environment.
    pub env: RuntimeEnv,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(
            std::env::var("BROWSER_BINARY_PATH").ok(),
            std::env::var("SERVER_PORT").ok(),
            std::env::var("MAX_BROWSERS").ok(),
            std::env::var("ENV").ok(),
        )
    }

    // Split out from `from_env` so tests can exercise parsing without
    // mutating process-global environment state.
    fn build(
        binary: Option<String>,
        server_port: Option<String>,
        max_browsers: Option<String>,
        env: Option<String>,
    ) -> Result<Self, ConfigError> {
        let browser_binary = match binary {
            Some(path) => detect::validate_binary(PathBuf::from(path))?,
            None => find_browser_binary()?,
        };

        let server_port = match server_port {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "SERVER_PORT",
                value: raw,
            })?,
            None => DEFAULT_SERVER_PORT,
        };

        let max_browsers = match max_browsers {
            Some(raw) => {
                let parsed: usize = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "MAX_BROWSERS",
                    value: raw.clone(),
                })?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidValue {
                        var: "MAX_BROWSERS",
                        value: raw,
                    });
                }
                parsed
            }
            None => DEFAULT_MAX_BROWSERS,
        };

        Ok(Self {
            browser_binary,
            server_port,
            max_browsers,
            env: RuntimeEnv::parse(env.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_binary() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chromium");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_apply_when_vars_unset() {
        let (_dir, binary) = fake_binary();
        let config = Config::build(
            Some(binary.to_string_lossy().into_owned()),
            None,
            None,
            None,
        )
        .unwrap();

        assert_eq!(config.server_port, DEFAULT_SERVER_PORT);
        assert_eq!(config.max_browsers, DEFAULT_MAX_BROWSERS);
        assert_eq!(config.env, RuntimeEnv::Development);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let (_dir, binary) = fake_binary();
        let config = Config::build(
            Some(binary.to_string_lossy().into_owned()),
            Some("9090".into()),
            Some("3".into()),
            Some("production".into()),
        )
        .unwrap();

        assert_eq!(config.server_port, 9090);
        assert_eq!(config.max_browsers, 3);
        assert_eq!(config.env, RuntimeEnv::Production);
    }

    #[test]
    fn rejects_unparseable_port() {
        let (_dir, binary) = fake_binary();
        let err = Config::build(
            Some(binary.to_string_lossy().into_owned()),
            Some("not-a-port".into()),
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { var: "SERVER_PORT", .. }));
    }

    #[test]
    fn rejects_zero_browsers() {
        let (_dir, binary) = fake_binary();
        let err = Config::build(
            Some(binary.to_string_lossy().into_owned()),
            None,
            Some("0".into()),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { var: "MAX_BROWSERS", .. }));
    }

    #[test]
    fn rejects_missing_binary() {
        let err = Config::build(Some("/nonexistent/chromium".into()), None, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::BinaryNotFound(_)));
    }

    #[test]
    fn rejects_non_executable_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chromium");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = Config::build(
            Some(path.to_string_lossy().into_owned()),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BinaryNotExecutable(_)));
    }

    #[test]
    fn unknown_env_falls_back_to_development() {
        assert_eq!(RuntimeEnv::parse(Some("staging")), RuntimeEnv::Development);
        assert_eq!(RuntimeEnv::parse(None), RuntimeEnv::Development);
        assert_eq!(RuntimeEnv::parse(Some("production")), RuntimeEnv::Production);
    }
}
