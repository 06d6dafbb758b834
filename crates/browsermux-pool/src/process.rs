//! A single supervised browser subprocess.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::PoolError;
use crate::ports::PortPool;

/// Grace period between SIGTERM and SIGKILL on stop.
const KILL_WAIT: Duration = Duration::from_secs(5);

/// One browser subprocess bound to a debug port and a scratch profile
/// directory. Both resources are acquired in [`BrowserProcess::new`] and
/// released exactly once, whether the process exits cleanly, crashes, or
/// never starts.
#[derive(Debug)]
pub struct BrowserProcess {
    binary: PathBuf,
    port: u16,
    user_data_dir: PathBuf,
    ports: Arc<PortPool>,
    child: Option<Child>,
    cleaned_up: bool,
}

impl BrowserProcess {
    /// Allocate a port and scratch directory for a new browser. Does not
    /// spawn the subprocess; call [`start`](Self::start) for that.
    pub fn new(binary: impl Into<PathBuf>, ports: Arc<PortPool>) -> Result<Self, PoolError> {
        let binary = validate_binary(binary.into())?;
        let port = ports.acquire()?;
        Self::with_acquired_port(binary, port, ports)
    }

    /// Like [`new`](Self::new) but on a specific free port. Used by crash
    /// replacement so the fresh browser keeps the dead one's port.
    pub fn on_port(
        binary: impl Into<PathBuf>,
        port: u16,
        ports: Arc<PortPool>,
    ) -> Result<Self, PoolError> {
        let binary = validate_binary(binary.into())?;
        ports.acquire_port(port)?;
        Self::with_acquired_port(binary, port, ports)
    }

    fn with_acquired_port(
        binary: PathBuf,
        port: u16,
        ports: Arc<PortPool>,
    ) -> Result<Self, PoolError> {
        let user_data_dir = std::env::temp_dir()
            .join("browsermux")
            .join(format!("profile-{port}-{}", Uuid::new_v4()));

        if let Err(err) = std::fs::create_dir_all(&user_data_dir) {
            // Undo the acquire before surfacing; the caller never saw the port.
            let _ = ports.release(port);
            return Err(err.into());
        }

        Ok(Self {
            binary,
            port,
            user_data_dir,
            ports,
            child: None,
            cleaned_up: false,
        })
    }

    /// Spawn the subprocess with remote debugging enabled on the assigned
    /// port. Callers should allow the browser a short readiness window
    /// (about two seconds) before issuing commands against it.
    pub async fn start(&mut self) -> Result<(), PoolError> {
        let mut command = Command::new(&self.binary);
        command
            .arg(format!("--remote-debugging-port={}", self.port))
            .arg(format!("--user-data-dir={}", self.user_data_dir.display()))
            .arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                self.cleanup();
                return Err(PoolError::SpawnFailed(err.to_string()));
            }
        };

        if let Some(stdout) = child.stdout.take() {
            drain_output(self.port, "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            drain_output(self.port, "stderr", stderr);
        }

        debug!(port = self.port, pid = child.id(), "browser process started");
        self.child = Some(child);
        Ok(())
    }

    /// Whether the subprocess is currently running. Non-blocking; no signal
    /// is sent.
    pub fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Request termination, wait a bounded time, then force-kill. The port
    /// and scratch directory are released regardless of how the process
    /// exits. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Some(pid) = child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }

            match tokio::time::timeout(KILL_WAIT, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(port = self.port, %status, "browser process exited");
                }
                Ok(Err(err)) => {
                    warn!(port = self.port, error = %err, "failed to reap browser process");
                }
                Err(_) => {
                    warn!(port = self.port, "browser ignored SIGTERM, force-killing");
                    if let Err(err) = child.kill().await {
                        warn!(port = self.port, error = %err, "failed to kill browser process");
                    }
                }
            }
        }
        self.cleanup();
    }

    /// Subprocess id, or 0 when not started.
    pub fn pid(&self) -> u32 {
        self.child.as_ref().and_then(Child::id).unwrap_or(0)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user_data_dir(&self) -> &Path {
        &self.user_data_dir
    }

    fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        if let Err(err) = self.ports.release(self.port) {
            warn!(port = self.port, error = %err, "failed to return port to pool");
        }
        if let Err(err) = std::fs::remove_dir_all(&self.user_data_dir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    dir = %self.user_data_dir.display(),
                    error = %err,
                    "failed to remove scratch profile directory"
                );
            }
        }
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        // kill_on_drop reaps the subprocess; the port and directory still
        // need returning if stop() was never reached.
        self.cleanup();
    }
}

fn validate_binary(path: PathBuf) -> Result<PathBuf, PoolError> {
    if !path.is_file() {
        return Err(PoolError::BinaryNotFound(path));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let executable = std::fs::metadata(&path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
        if !executable {
            return Err(PoolError::BinaryNotExecutable(path));
        }
    }

    Ok(path)
}

fn drain_output(
    port: u16,
    stream: &'static str,
    source: impl tokio::io::AsyncRead + Unpin + Send + 'static,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(source).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace!(port, stream, "{line}");
        }
    });
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
