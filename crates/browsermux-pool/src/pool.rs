//! Fixed-capacity pool of managed browser processes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::PoolError;
use crate::ports::PortPool;
use crate::process::BrowserProcess;

/// How long a freshly spawned browser gets before commands are issued.
const READINESS_WAIT: Duration = Duration::from_secs(2);

/// Interval between liveness probes.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Point-in-time metrics for one managed process.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub port: u16,
    pub session_count: i64,
    pub uptime_secs: u64,
    pub last_healthy: DateTime<Utc>,
}

/// Aggregate metrics for the whole pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolMetrics {
    pub capacity: usize,
    pub total_sessions: i64,
    pub processes: Vec<ProcessMetrics>,
}

/// A browser process plus the accounting needed to place sessions on it.
///
/// The session counter is only ever touched with atomic adds, so the load
/// balancer can read it without taking the process lock.
#[derive(Debug)]
pub struct ManagedProcess {
    port: u16,
    process: tokio::sync::Mutex<BrowserProcess>,
    sessions: AtomicI64,
    started_at: Instant,
    last_healthy: parking_lot::Mutex<DateTime<Utc>>,
}

impl ManagedProcess {
    /// Create, start, and readiness-wait a browser on the next free port.
    pub async fn launch(binary: &Path, ports: &Arc<PortPool>) -> Result<Arc<Self>, PoolError> {
        let process = BrowserProcess::new(binary, ports.clone())?;
        Self::start(process).await
    }

    /// Create, start, and readiness-wait a browser on a specific free port.
    pub async fn launch_on(
        binary: &Path,
        port: u16,
        ports: &Arc<PortPool>,
    ) -> Result<Arc<Self>, PoolError> {
        let process = BrowserProcess::on_port(binary, port, ports.clone())?;
        Self::start(process).await
    }

    async fn start(mut process: BrowserProcess) -> Result<Arc<Self>, PoolError> {
        let port = process.port();
        process.start().await?;
        tokio::time::sleep(READINESS_WAIT).await;

        info!(port, pid = process.pid(), "browser process ready");
        Ok(Arc::new(Self {
            port,
            process: tokio::sync::Mutex::new(process),
            sessions: AtomicI64::new(0),
            started_at: Instant::now(),
            last_healthy: parking_lot::Mutex::new(Utc::now()),
        }))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn session_count(&self) -> i64 {
        self.sessions.load(Ordering::Relaxed)
    }

    pub fn increment_sessions(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_sessions(&self) {
        self.sessions.fetch_add(-1, Ordering::Relaxed);
    }

    /// Liveness probe; refreshes the last-healthy instant on success.
    pub async fn is_healthy(&self) -> bool {
        let alive = self.process.lock().await.is_alive();
        if alive {
            *self.last_healthy.lock() = Utc::now();
        }
        alive
    }

    pub async fn stop(&self) {
        self.process.lock().await.stop().await;
    }

    pub fn metrics(&self) -> ProcessMetrics {
        ProcessMetrics {
            port: self.port,
            session_count: self.session_count(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            last_healthy: *self.last_healthy.lock(),
        }
    }
}

/// Bounded set of managed processes with a background health monitor.
#[derive(Debug)]
pub struct ProcessPool {
    binary: PathBuf,
    ports: Arc<PortPool>,
    processes: RwLock<Vec<Arc<ManagedProcess>>>,
    cancel: CancellationToken,
    monitor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ProcessPool {
    /// Eagerly start `capacity` browsers, each on a distinct port. If any of
    /// them fails, everything already started is stopped before the error is
    /// returned.
    pub async fn launch(
        binary: PathBuf,
        capacity: usize,
        ports: Arc<PortPool>,
    ) -> Result<Arc<Self>, PoolError> {
        let mut processes = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            match ManagedProcess::launch(&binary, &ports).await {
                Ok(process) => processes.push(process),
                Err(err) => {
                    error!(error = %err, "browser pool startup failed, rolling back");
                    for process in &processes {
                        process.stop().await;
                    }
                    return Err(err);
                }
            }
        }

        info!(capacity, "browser pool started");
        let pool = Arc::new(Self {
            binary,
            ports,
            processes: RwLock::new(processes),
            cancel: CancellationToken::new(),
            monitor: parking_lot::Mutex::new(None),
        });
        pool.spawn_monitor();
        Ok(pool)
    }

    fn spawn_monitor(self: &Arc<Self>) {
        let pool = Arc::clone(self);
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => pool.run_health_checks().await,
                }
            }
            debug!("health monitor stopped");
        });
        *self.monitor.lock() = Some(handle);
    }

    async fn run_health_checks(&self) {
        let snapshot = self.processes.read().await.clone();
        for process in snapshot {
            if process.is_healthy().await {
                continue;
            }

            let port = process.port();
            warn!(port, "browser process failed liveness probe, replacing");
            process.stop().await;

            match ManagedProcess::launch_on(&self.binary, port, &self.ports).await {
                Ok(replacement) => {
                    let mut processes = self.processes.write().await;
                    if let Some(slot) = processes
                        .iter_mut()
                        .find(|candidate| Arc::ptr_eq(candidate, &process))
                    {
                        *slot = replacement;
                        info!(port, "browser process replaced");
                    } else {
                        // Stopped concurrently (shutdown); discard the spare.
                        replacement.stop().await;
                    }
                }
                Err(err) => {
                    error!(port, error = %err, "failed to replace browser process");
                    self.processes
                        .write()
                        .await
                        .retain(|candidate| !Arc::ptr_eq(candidate, &process));
                }
            }
        }
    }

    /// Snapshot of the current processes.
    pub async fn processes(&self) -> Vec<Arc<ManagedProcess>> {
        self.processes.read().await.clone()
    }

    /// Look up the managed process currently on `port`.
    pub async fn find(&self, port: u16) -> Option<Arc<ManagedProcess>> {
        self.processes
            .read()
            .await
            .iter()
            .find(|process| process.port() == port)
            .cloned()
    }

    pub async fn metrics(&self) -> PoolMetrics {
        let processes: Vec<ProcessMetrics> = self
            .processes
            .read()
            .await
            .iter()
            .map(|process| process.metrics())
            .collect();

        PoolMetrics {
            capacity: processes.len(),
            total_sessions: processes.iter().map(|m| m.session_count).sum(),
            processes,
        }
    }

    /// Cancel the health monitor, then stop every process. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let monitor = self.monitor.lock().take();
        if let Some(handle) = monitor {
            let _ = handle.await;
        }

        let processes: Vec<_> = self.processes.write().await.drain(..).collect();
        for process in &processes {
            process.stop().await;
        }
        if !processes.is_empty() {
            info!(stopped = processes.len(), "browser pool shut down");
        }
    }
}

#[cfg(test)]
impl ManagedProcess {
    /// Wrap an unstarted process so placement and accounting can be tested
    /// without spawning a real browser.
    pub(crate) fn stub(process: BrowserProcess) -> Arc<Self> {
        Arc::new(Self {
            port: process.port(),
            process: tokio::sync::Mutex::new(process),
            sessions: AtomicI64::new(0),
            started_at: Instant::now(),
            last_healthy: parking_lot::Mutex::new(Utc::now()),
        })
    }
}

#[cfg(test)]
impl ProcessPool {
    /// Pool over pre-built processes with no health monitor running.
    pub(crate) fn stub(
        binary: PathBuf,
        ports: Arc<PortPool>,
        processes: Vec<Arc<ManagedProcess>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            binary,
            ports,
            processes: RwLock::new(processes),
            cancel: CancellationToken::new(),
            monitor: parking_lot::Mutex::new(None),
        })
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
