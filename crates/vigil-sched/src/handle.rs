//! Scheduled task handle
//!
//! One handle per registered schedule. The trigger engine drives the state
//! machine through `on_fired` / `on_completed` / `on_misfired` /
//! `veto_check`; consumers block on `get` and `wait_on_next_execution`, or
//! call `cancel` / `pause` / listener operations, all concurrently.
//!
//! The two gates ping-pong: `on_fired` raises the result-access gate (future
//! `get` calls block) and drops the next-execution gate (releasing "wait for
//! next firing" callers); `on_completed` re-arms the next-execution gate and
//! drops the result-access gate (releasing blocked getters). This yields two
//! independent synchronization points a one-shot future cannot express.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use vigil_sync::{Gate, WaitError};

use crate::adapter::FiringOutcome;
use crate::counters::{CounterSnapshot, TaskCounters};
use crate::dispatch::DispatchPool;
use crate::error::{GetError, TaskError};
use crate::listener::{ListenerId, ListenerRegistry, TaskEvent, TaskListener};
use crate::registry::{ManagedTask, TaskRegistry};
use crate::state::{ScheduleKind, TaskState};
use crate::trigger::{TaskKey, TriggerEngine};

/// The multi-fire continuation handle for one schedule.
///
/// Created when a unit of work is scheduled; unregistered when the trigger
/// exhausts its fire times or `cancel` succeeds. `V` is the payload's value
/// type; it must be `Clone` so one completed result can fan out to every
/// blocked getter and listener.
pub struct ScheduledTaskHandle<V> {
    key: TaskKey,
    kind: ScheduleKind,
    state: Mutex<TaskState>,

    /// Raised while a firing is in flight; `get` blocks on it.
    result_access: Gate,
    /// Raised between firings; `wait_on_next_execution` blocks on it.
    next_execution: Gate,

    /// Captured value of the most recently completed firing.
    result: Mutex<Option<V>>,
    /// Captured error of the most recently completed firing.
    error: Mutex<Option<Arc<TaskError>>>,

    counters: TaskCounters,
    last_start: Mutex<Option<Instant>>,
    last_execution_millis: AtomicU64,

    /// While set, every firing is vetoed before the adapter runs.
    veto_enabled: AtomicBool,

    listeners: ListenerRegistry<V>,
    engine: Arc<dyn TriggerEngine>,
    pool: Arc<dyn DispatchPool>,
    registry: Mutex<Option<Weak<TaskRegistry>>>,

    /// Serializes `cancel` against completion bookkeeping.
    bookkeeping: Mutex<()>,
}

impl<V> ScheduledTaskHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a handle for a schedule the engine registered under `key`.
    ///
    /// Both gates start raised: a `get` or `wait_on_next_execution` issued
    /// before the first firing blocks until that firing completes or starts,
    /// respectively.
    pub fn new(
        key: TaskKey,
        kind: ScheduleKind,
        engine: Arc<dyn TriggerEngine>,
        pool: Arc<dyn DispatchPool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            result_access: Gate::new(format!("{key}:result-access"), true),
            next_execution: Gate::new(format!("{key}:next-execution"), true),
            key,
            kind,
            state: Mutex::new(TaskState::Unfired),
            result: Mutex::new(None),
            error: Mutex::new(None),
            counters: TaskCounters::new(),
            last_start: Mutex::new(None),
            last_execution_millis: AtomicU64::new(0),
            veto_enabled: AtomicBool::new(false),
            listeners: ListenerRegistry::new(),
            engine,
            pool,
            registry: Mutex::new(None),
            bookkeeping: Mutex::new(()),
        })
    }

    /// Create a handle and register it with a management registry.
    ///
    /// The handle unregisters itself on cancellation or when the schedule
    /// exhausts its fire times.
    pub fn registered(
        key: TaskKey,
        kind: ScheduleKind,
        engine: Arc<dyn TriggerEngine>,
        pool: Arc<dyn DispatchPool>,
        registry: &Arc<TaskRegistry>,
    ) -> Arc<Self> {
        let handle = Self::new(key, kind, engine, pool);
        *handle.registry.lock() = Some(Arc::downgrade(registry));
        registry.register(handle.clone());
        handle
    }

    /// The schedule's identity, as issued by the engine.
    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    /// Whether the schedule fires once or repeatedly.
    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    /// True once the schedule reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// True if the schedule was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    // =========================================================================
    // Engine-driven callbacks
    // =========================================================================

    /// The trigger fired: a firing is starting.
    ///
    /// Raises the result-access gate, drops the next-execution gate, clears
    /// the previous firing's error and dispatches the fired event.
    pub fn on_fired(&self) {
        *self.last_start.lock() = Some(Instant::now());

        self.result_access.raise();
        self.next_execution.drop_gate();

        *self.error.lock() = None;
        self.transition(TaskState::Firing);
        let fires = self.counters.increment_fire();
        tracing::debug!(task = %self.key, fires, "trigger fired");

        self.listeners
            .notify(&self.pool, &self.key, TaskEvent::Fired { fire_count: fires });
    }

    /// Veto check, asked by the engine before each firing.
    ///
    /// Returns true iff the schedule is paused; the firing is then skipped
    /// (not cancelled), the veto counter advances, no gate flips, and future
    /// fire times keep being computed.
    pub fn veto_check(&self) -> bool {
        if !self.veto_enabled.load(Ordering::Acquire) {
            return false;
        }
        let vetoes = self.counters.increment_veto();
        tracing::debug!(task = %self.key, vetoes, "firing vetoed");
        self.listeners.notify(
            &self.pool,
            &self.key,
            TaskEvent::Vetoed { veto_count: vetoes },
        );
        true
    }

    /// A firing finished; `has_next` is true iff more fire times remain.
    ///
    /// Captures the outcome, advances counters and state, re-arms the
    /// next-execution gate and drops the result-access gate so every blocked
    /// getter observes this firing's outcome.
    pub fn on_completed(&self, outcome: FiringOutcome<V>, has_next: bool) {
        let _bookkeeping = self.bookkeeping.lock();

        let elapsed = outcome
            .elapsed
            .or_else(|| self.last_start.lock().map(|started| started.elapsed()));
        if let Some(elapsed) = elapsed {
            self.last_execution_millis
                .store(elapsed.as_millis() as u64, Ordering::Relaxed);
        }

        // Transient marker between payload return and final bookkeeping
        self.transition(TaskState::Fired);
        self.counters.increment_execute();

        let (succeeded, event) = match outcome.result {
            Ok(value) => {
                *self.error.lock() = None;
                *self.result.lock() = value.clone();
                let completes = self.counters.increment_complete();
                (
                    true,
                    TaskEvent::Completed {
                        result: value,
                        complete_count: completes,
                    },
                )
            }
            Err(err) => {
                let err = Arc::new(err);
                tracing::debug!(task = %self.key, error = %err, "firing failed");
                *self.error.lock() = Some(err);
                let fails = self.counters.increment_fail();
                (false, TaskEvent::Failed { fail_count: fails })
            }
        };

        let next_state = match (succeeded, has_next) {
            (true, true) => TaskState::CompletedContinuing,
            (true, false) => TaskState::Completed,
            (false, true) => TaskState::ExceptionContinuing,
            (false, false) => TaskState::ExceptionRaised,
        };
        self.transition(next_state);

        // The ping-pong: re-arm "next execution", release blocked getters.
        // The captured result/error must be in place before this drop.
        self.next_execution.raise();
        self.result_access.drop_gate();

        self.listeners.notify(&self.pool, &self.key, event);

        if !has_next {
            self.unregister();
            self.listeners
                .notify(&self.pool, &self.key, TaskEvent::Cancelled);
        }
    }

    /// The engine could not invoke the task at its fire time.
    ///
    /// No adapter invocation happened; a misfire error is captured and the
    /// completion-side gate choreography runs so the contract matches a
    /// genuine failure (the flips are no-ops on an idle handle).
    pub fn on_misfired(&self, has_next: bool) {
        let _bookkeeping = self.bookkeeping.lock();
        tracing::warn!(task = %self.key, "trigger misfired");

        *self.error.lock() = Some(Arc::new(TaskError::Misfire));
        let fails = self.counters.increment_fail();
        self.transition(if has_next {
            TaskState::ExceptionContinuing
        } else {
            TaskState::ExceptionRaised
        });

        self.next_execution.raise();
        self.result_access.drop_gate();

        self.listeners
            .notify(&self.pool, &self.key, TaskEvent::Failed { fail_count: fails });

        if !has_next {
            self.unregister();
            self.listeners
                .notify(&self.pool, &self.key, TaskEvent::Cancelled);
        }
    }

    // =========================================================================
    // Consumer operations
    // =========================================================================

    /// Block until the current (or first) firing completes, then return its
    /// captured result.
    ///
    /// A normal return or a `GetError::Failed` always reflects the most
    /// recently completed firing: the gate is re-raised at the start of every
    /// firing before the next completion drops it. Repeated calls between
    /// firings re-read the same captured result.
    pub fn get(&self) -> Result<Option<V>, GetError> {
        self.result_access.await_drop()?;
        self.read_result()
    }

    /// As `get`, but fail with `GetError::Timeout` once the timeout elapses
    /// with no completed firing. Neither timeout nor interrupt mutates
    /// handle state.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<V>, GetError> {
        self.result_access.await_drop_timeout(timeout)?;
        self.read_result()
    }

    fn read_result(&self) -> Result<Option<V>, GetError> {
        if let Some(err) = self.error.lock().clone() {
            return Err(GetError::Failed(err));
        }
        let value = self.result.lock().clone();
        // A captured `None` is a valid outcome (effect payloads); only a
        // handle cancelled with no completed firing at all reads as Cancelled
        if value.is_none()
            && self.is_cancelled()
            && self.counters.snapshot().complete_count == 0
        {
            return Err(GetError::Cancelled);
        }
        Ok(value)
    }

    /// Block until the next firing starts; return immediately if the
    /// schedule is already cancelled.
    pub fn wait_on_next_execution(&self) -> Result<(), WaitError> {
        if self.is_cancelled() {
            return Ok(());
        }
        match self.next_execution.await_drop() {
            Err(WaitError::Interrupted) if self.is_cancelled() => Ok(()),
            other => other,
        }
    }

    /// As `wait_on_next_execution`, with a timeout.
    pub fn wait_on_next_execution_timeout(&self, timeout: Duration) -> Result<(), WaitError> {
        if self.is_cancelled() {
            return Ok(());
        }
        match self.next_execution.await_drop_timeout(timeout) {
            Err(WaitError::Interrupted) if self.is_cancelled() => Ok(()),
            other => other,
        }
    }

    /// Cancel the schedule.
    ///
    /// One-shot schedules can only be cancelled from `Unfired`; otherwise
    /// this returns false. Recurring schedules always unschedule and return
    /// true; an in-flight firing still completes its own bookkeeping
    /// (serialized by the bookkeeping lock). On success the handle
    /// unregisters, blocked getters unblock observing the cancellation, and
    /// the cancelled event is dispatched. Idempotent: a second call returns
    /// false.
    ///
    /// The engine's `unschedule` is invoked after the local bookkeeping is
    /// done and its lock released, so an engine that re-enters a handle
    /// callback from `unschedule` is safe.
    ///
    /// `_may_interrupt` is accepted for interface parity and ignored:
    /// cancellation is cooperative, in-flight firings are never interrupted.
    pub fn cancel(&self, _may_interrupt: bool) -> bool {
        {
            let _bookkeeping = self.bookkeeping.lock();

            let current = self.state();
            if current == TaskState::Cancelled {
                return false;
            }
            if self.kind == ScheduleKind::OneShot && current != TaskState::Unfired {
                return false;
            }

            *self.state.lock() = TaskState::Cancelled;
            self.unregister();

            // Completion choreography: blocked getters unblock and observe
            // the cancellation; the next-execution gate is re-armed then
            // interrupted so already-parked waiters return instead of
            // parking forever.
            self.next_execution.raise();
            self.result_access.drop_gate();
            self.next_execution.interrupt();
        }

        // Outside the bookkeeping lock: an engine whose unschedule
        // synchronously re-enters a handle callback must not deadlock on it.
        // Concurrent callbacks observe the Cancelled state and leave it.
        if let Err(err) = self.engine.unschedule(&self.key) {
            tracing::warn!(task = %self.key, error = %err, "unschedule failed, cancelling locally");
        }

        self.listeners
            .notify(&self.pool, &self.key, TaskEvent::Cancelled);
        tracing::debug!(task = %self.key, "schedule cancelled");
        true
    }

    /// Toggle the veto: while enabled, every firing is skipped (not
    /// cancelled) and the veto counter advances.
    pub fn pause(&self, enabled: bool) {
        self.veto_enabled.store(enabled, Ordering::Release);
    }

    /// Whether firings are currently vetoed.
    pub fn is_paused(&self) -> bool {
        self.veto_enabled.load(Ordering::Acquire)
    }

    /// Register a lifecycle listener.
    pub fn add_listener(&self, listener: Arc<dyn TaskListener<V>>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Remove a lifecycle listener. Returns true if it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // =========================================================================
    // Management snapshot
    // =========================================================================

    /// Point-in-time copy of the cumulative counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Elapsed wall-clock time of the last completed firing, in ms.
    pub fn last_execution_millis(&self) -> u64 {
        self.last_execution_millis.load(Ordering::Relaxed)
    }

    /// Threads currently blocked in `get` (monitoring estimate).
    pub fn result_waiters(&self) -> usize {
        self.result_access.waiter_count()
    }

    /// Threads currently blocked in `wait_on_next_execution` (monitoring
    /// estimate).
    pub fn next_execution_waiters(&self) -> usize {
        self.next_execution.waiter_count()
    }

    fn transition(&self, next: TaskState) {
        let mut state = self.state.lock();
        // A concurrent cancel wins; its bookkeeping already ran
        if *state != TaskState::Cancelled {
            *state = next;
        }
    }

    fn unregister(&self) {
        if let Some(weak) = self.registry.lock().take() {
            if let Some(registry) = weak.upgrade() {
                registry.unregister(&self.key);
            }
        }
    }
}

impl<V> Drop for ScheduledTaskHandle<V> {
    fn drop(&mut self) {
        // Teardown must not strand parked waiters (possible with scoped
        // threads borrowing the handle)
        self.result_access.interrupt();
        self.next_execution.interrupt();
    }
}

impl<V> std::fmt::Debug for ScheduledTaskHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTaskHandle")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("state", &*self.state.lock())
            .field("result_access", &self.result_access)
            .field("next_execution", &self.next_execution)
            .finish()
    }
}

impl<V> ManagedTask for ScheduledTaskHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn key(&self) -> TaskKey {
        self.key.clone()
    }

    fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    fn last_execution_millis(&self) -> u64 {
        self.last_execution_millis.load(Ordering::Relaxed)
    }

    fn is_paused(&self) -> bool {
        self.is_paused()
    }

    fn set_paused(&self, paused: bool) {
        self.pause(paused);
    }

    fn cancel_task(&self) -> bool {
        self.cancel(false)
    }
}
