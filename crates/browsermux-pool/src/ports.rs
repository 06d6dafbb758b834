//! Bounded allocator for remote-debugging ports.
//!
//! The pool reflects OS port usage, so there is exactly one instance per
//! service, constructed explicitly and shared by `Arc` — never module-global
//! state. Invariant: a port is in the free set iff no live browser process
//! currently owns it.

use std::collections::BTreeSet;
use std::ops::Range;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::PoolError;

/// First remote-debugging port handed out by default.
pub const DEFAULT_BASE_PORT: u16 = 9222;

/// Counts reported by [`PortPool::stats`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PortPoolStats {
    pub total: usize,
    pub available: usize,
}

/// Set of free ports drawn from a contiguous range.
#[derive(Debug)]
pub struct PortPool {
    range: Range<u16>,
    free: Mutex<BTreeSet<u16>>,
}

impl PortPool {
    /// Create a pool over `[start, start + count)`.
    pub fn new(start: u16, count: u16) -> Self {
        let range = start..start + count;
        Self {
            free: Mutex::new(range.clone().collect()),
            range,
        }
    }

    /// Remove and return the lowest free port.
    pub fn acquire(&self) -> Result<u16, PoolError> {
        let mut free = self.free.lock();
        let port = free.iter().next().copied().ok_or(PoolError::PoolExhausted)?;
        free.remove(&port);
        Ok(port)
    }

    /// Remove a specific free port. Used when replacing a crashed browser so
    /// the replacement keeps the dead process's port.
    pub fn acquire_port(&self, port: u16) -> Result<(), PoolError> {
        if !self.range.contains(&port) {
            return Err(PoolError::InvalidPort(port));
        }
        if !self.free.lock().remove(&port) {
            return Err(PoolError::InvalidPort(port));
        }
        Ok(())
    }

    /// Return a previously acquired port to the pool. Releasing a port that
    /// was never acquired, or is outside the range, is a programming error.
    pub fn release(&self, port: u16) -> Result<(), PoolError> {
        if !self.range.contains(&port) {
            return Err(PoolError::InvalidPort(port));
        }
        if !self.free.lock().insert(port) {
            return Err(PoolError::InvalidPort(port));
        }
        Ok(())
    }

    pub fn stats(&self) -> PortPoolStats {
        PortPoolStats {
            total: self.range.len(),
            available: self.free.lock().len(),
        }
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
