//! Cumulative task counters
//!
//! Atomics updated on the firing-callback path, read by the management
//! surface.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters for one schedule.
#[derive(Debug, Default)]
pub struct TaskCounters {
    fire: AtomicU64,
    execute: AtomicU64,
    complete: AtomicU64,
    fail: AtomicU64,
    veto: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Times the trigger fired for this schedule.
    pub fire_count: u64,
    /// Times the adapter was executed (success or failure).
    pub execute_count: u64,
    /// Firings that completed successfully.
    pub complete_count: u64,
    /// Firings that failed (including misfires).
    pub fail_count: u64,
    /// Firings skipped by the veto policy.
    pub veto_count: u64,
}

impl TaskCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_fire(&self) -> u64 {
        self.fire.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn increment_execute(&self) -> u64 {
        self.execute.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn increment_complete(&self) -> u64 {
        self.complete.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn increment_fail(&self) -> u64 {
        self.fail.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn increment_veto(&self) -> u64 {
        self.veto.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            fire_count: self.fire.load(Ordering::Relaxed),
            execute_count: self.execute.load(Ordering::Relaxed),
            complete_count: self.complete.load(Ordering::Relaxed),
            fail_count: self.fail.load(Ordering::Relaxed),
            veto_count: self.veto.load(Ordering::Relaxed),
        }
    }
}
