//! Least-loaded placement over the process pool.

use std::sync::Arc;

use crate::error::PoolError;
use crate::pool::ProcessPool;

/// Stateless façade that picks the browser process with the fewest live
/// sessions. `pick` never mutates counters — the session manager increments
/// on create and decrements on destroy — so consecutive picks observe
/// eventually-consistent load.
#[derive(Clone)]
pub struct LoadBalancer {
    pool: Arc<ProcessPool>,
}

impl LoadBalancer {
    pub fn new(pool: Arc<ProcessPool>) -> Self {
        Self { pool }
    }

    /// Port of the least-loaded process; ties break toward the lowest port
    /// so placement is deterministic.
    pub async fn pick(&self) -> Result<u16, PoolError> {
        self.pool
            .processes()
            .await
            .iter()
            .min_by_key(|process| (process.session_count(), process.port()))
            .map(|process| process.port())
            .ok_or(PoolError::NoProcessAvailable)
    }
}

#[cfg(test)]
#[path = "balancer_tests.rs"]
mod tests;
