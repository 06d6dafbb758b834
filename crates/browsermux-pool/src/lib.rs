//! Browser process pool.
//!
//! Three layers, bottom up:
//!
//! - [`PortPool`] — hands out remote-debugging ports from a bounded range.
//! - [`BrowserProcess`] — one Chromium subprocess on an assigned port with a
//!   scratch profile directory; start/stop never leak either resource.
//! - [`ProcessPool`] + [`LoadBalancer`] — a fixed-capacity set of managed
//!   processes with per-process session counters, a background health monitor
//!   that replaces crashed browsers in place, and least-loaded placement.

mod balancer;
mod error;
mod pool;
mod ports;
mod process;

pub use balancer::LoadBalancer;
pub use error::PoolError;
pub use pool::{ManagedProcess, PoolMetrics, ProcessMetrics, ProcessPool};
pub use ports::{PortPool, PortPoolStats, DEFAULT_BASE_PORT};
pub use process::BrowserProcess;
