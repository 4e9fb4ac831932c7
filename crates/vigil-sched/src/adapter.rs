//! Task unit adapter
//!
//! `TaskUnit` wraps a caller-supplied payload for invocation by the trigger
//! engine's worker thread at each fire time. The contract with the engine is
//! "never throw, always store": whatever the payload does, `invoke` returns a
//! definite `FiringOutcome` and nothing propagates into the engine (most
//! trigger engines abort future firings on an unhandled failure).

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::error::TaskError;
use crate::payload::{PayloadError, TaskPayload};

/// The tagged result of one firing.
///
/// `result` is the captured value (or `None` for an effect payload) or the
/// captured failure. `elapsed` is the instrumentation side channel: wall-clock
/// time measured around the payload call when instrumentation is enabled,
/// separate from the returned value.
#[derive(Debug)]
pub struct FiringOutcome<V> {
    /// Captured payload result for this firing.
    pub result: Result<Option<V>, TaskError>,

    /// Measured invocation time, when instrumentation is enabled.
    pub elapsed: Option<Duration>,
}

impl<V> FiringOutcome<V> {
    /// Build an outcome for a firing that never invoked the payload.
    pub fn failure(error: TaskError) -> Self {
        Self {
            result: Err(error),
            elapsed: None,
        }
    }
}

/// Adapter between a caller-supplied payload and the trigger engine.
///
/// One adapter instance backs every firing of a schedule. The internal mutex
/// guarantees at most one invocation of the stateful `FnMut` payload is in
/// flight even if two engine workers overlap.
pub struct TaskUnit<V> {
    payload: Mutex<Option<TaskPayload<V>>>,
    instrumented: bool,
}

impl<V> TaskUnit<V> {
    /// Create an adapter around a payload, with instrumentation enabled.
    pub fn new(payload: TaskPayload<V>) -> Self {
        Self {
            payload: Mutex::new(Some(payload)),
            instrumented: true,
        }
    }

    /// Create an adapter with no payload attached.
    ///
    /// Every invocation of an unconfigured unit captures a
    /// `TaskError::Configuration` into the firing.
    pub fn unconfigured() -> Self {
        Self {
            payload: Mutex::new(None),
            instrumented: false,
        }
    }

    /// Enable or disable invocation timing.
    pub fn with_instrumentation(mut self, enabled: bool) -> Self {
        self.instrumented = enabled;
        self
    }

    /// Run one firing of the payload synchronously.
    ///
    /// Called by the engine's worker thread at each fire time. Dispatches on
    /// the payload kind; a missing payload fails fast with a configuration
    /// error captured into the outcome. Payload errors and panics are both
    /// captured, never rethrown.
    pub fn invoke(&self) -> FiringOutcome<V> {
        // At most one invocation in flight per unit
        let mut payload = self.payload.lock();

        let started = self.instrumented.then(Instant::now);
        let result = match payload.as_mut() {
            None => {
                tracing::warn!("task unit invoked with no payload attached");
                Err(TaskError::Configuration(
                    "no payload attached to task unit".to_string(),
                ))
            }
            Some(payload) => run_payload(payload),
        };

        FiringOutcome {
            result,
            elapsed: started.map(|s| s.elapsed()),
        }
    }
}

fn run_payload<V>(payload: &mut TaskPayload<V>) -> Result<Option<V>, TaskError> {
    let invoked = panic::catch_unwind(AssertUnwindSafe(|| match payload {
        TaskPayload::Producer(f) => f().map(Some),
        TaskPayload::Effect(f) => f().map(|_| None),
        TaskPayload::Unit(unit) => unit.execute().map(Some),
    }));

    match invoked {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TaskError::ExecutionFailed(err)),
        Err(panic) => Err(TaskError::ExecutionFailed(PayloadError::msg(
            panic_message(panic.as_ref()),
        ))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "payload panicked".to_string()
    }
}
