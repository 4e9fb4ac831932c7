//! Two-state reusable gate
//!
//! A gate is either raised (threads calling `await_drop` park) or dropped
//! (threads pass through immediately). Dropping the gate releases every
//! currently parked waiter at once; raising it re-arms the gate for the next
//! round. No ordering is guaranteed among released waiters.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Errors returned from a blocked gate wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// The timeout elapsed with the gate still raised
    #[error("gate wait timed out")]
    Timeout,

    /// The waiter was woken by an explicit interrupt
    #[error("gate wait interrupted")]
    Interrupted,
}

struct GateInner {
    /// True while the gate blocks waiters
    raised: bool,

    /// Bumped by `drop_gate()`; a parked waiter passes once the epoch moves
    /// past the one it entered with, even if the gate was re-raised before
    /// the waiter reacquired the lock
    drop_epoch: u64,

    /// Bumped by `interrupt()`; a parked waiter that observes a newer
    /// generation than the one it entered with fails with `Interrupted`
    interrupt_generation: u64,
}

/// A named, reusable two-state synchronization barrier.
///
/// While raised, every `await_drop` call blocks. `drop_gate` atomically
/// releases all current waiters and lets subsequent callers pass until the
/// gate is raised again. The flag is guarded by a mutex and waiters park on a
/// condvar, so a woken thread always re-checks the flag under the lock
/// (spurious wakeups cannot leak through a raised gate).
pub struct Gate {
    name: String,
    inner: Mutex<GateInner>,
    cond: Condvar,
    waiters: AtomicUsize,
}

impl Gate {
    /// Create a new gate with the given name and initial state.
    pub fn new(name: impl Into<String>, raised: bool) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(GateInner {
                raised,
                drop_epoch: 0,
                interrupt_generation: 0,
            }),
            cond: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Get the gate's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether the gate is currently raised.
    pub fn is_raised(&self) -> bool {
        self.inner.lock().raised
    }

    /// Number of threads currently parked on the gate.
    ///
    /// This is an estimate intended for monitoring only; it can be stale by
    /// the time the caller reads it.
    pub fn waiter_count(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }

    /// Block the calling thread until the gate is dropped.
    ///
    /// Returns immediately if the gate is not raised. Fails with
    /// `WaitError::Interrupted` if `interrupt()` is called while parked.
    pub fn await_drop(&self) -> Result<(), WaitError> {
        let mut inner = self.inner.lock();
        if !inner.raised {
            return Ok(());
        }
        let entered_at = inner.interrupt_generation;
        let entered_epoch = inner.drop_epoch;
        self.waiters.fetch_add(1, Ordering::Relaxed);

        let outcome = loop {
            self.cond.wait(&mut inner);
            if inner.interrupt_generation != entered_at {
                break Err(WaitError::Interrupted);
            }
            // An epoch advance means the gate was dropped while this thread
            // was parked, even if it has been re-raised since
            if inner.drop_epoch != entered_epoch || !inner.raised {
                break Ok(());
            }
            // spurious wakeup with the gate still raised; park again
        };

        self.waiters.fetch_sub(1, Ordering::Relaxed);
        outcome
    }

    /// Block the calling thread until the gate is dropped or the timeout
    /// elapses.
    ///
    /// Fails with `WaitError::Timeout` if the deadline passes with the gate
    /// still raised, or `WaitError::Interrupted` on an explicit interrupt.
    /// Neither failure mutates gate state.
    pub fn await_drop_timeout(&self, timeout: Duration) -> Result<(), WaitError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        if !inner.raised {
            return Ok(());
        }
        let entered_at = inner.interrupt_generation;
        let entered_epoch = inner.drop_epoch;
        self.waiters.fetch_add(1, Ordering::Relaxed);

        let outcome = loop {
            let timed_out = self.cond.wait_until(&mut inner, deadline).timed_out();
            if inner.interrupt_generation != entered_at {
                break Err(WaitError::Interrupted);
            }
            if inner.drop_epoch != entered_epoch || !inner.raised {
                break Ok(());
            }
            if timed_out {
                break Err(WaitError::Timeout);
            }
        };

        self.waiters.fetch_sub(1, Ordering::Relaxed);
        outcome
    }

    /// Raise the gate so future `await_drop` calls block.
    ///
    /// Returns true iff the gate transitioned from dropped to raised; raising
    /// an already-raised gate is a no-op returning false.
    pub fn raise(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.raised {
            return false;
        }
        inner.raised = true;
        tracing::trace!(gate = %self.name, "gate raised");
        true
    }

    /// Drop the gate, releasing every currently parked waiter.
    ///
    /// Returns true iff the gate transitioned from raised to dropped. Waiters
    /// parked at the moment of the drop pass even if the gate is raised again
    /// before they get scheduled.
    pub fn drop_gate(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.raised {
            return false;
        }
        inner.raised = false;
        inner.drop_epoch += 1;
        tracing::trace!(gate = %self.name, waiters = self.waiter_count(), "gate dropped");
        self.cond.notify_all();
        true
    }

    /// Wake every currently parked waiter with `WaitError::Interrupted`
    /// without changing the raised flag.
    ///
    /// Only threads parked at the moment of the call observe the interrupt;
    /// later waiters park normally.
    pub fn interrupt(&self) {
        let mut inner = self.inner.lock();
        inner.interrupt_generation += 1;
        tracing::debug!(gate = %self.name, waiters = self.waiter_count(), "gate interrupted");
        self.cond.notify_all();
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("name", &self.name)
            .field("raised", &self.is_raised())
            .field("waiters", &self.waiter_count())
            .finish()
    }
}
