//! Error taxonomy for the scheduling core
//!
//! Adapter-side failures (`TaskError`) are always captured into the firing,
//! never thrown into the trigger engine. Wait-side failures (`GetError`)
//! are local to the calling thread and never mutate handle state.

use std::sync::Arc;

use crate::payload::PayloadError;
use crate::trigger::TaskKey;

/// A failure captured into a single firing of a scheduled task.
///
/// These never propagate to the trigger engine's worker thread; the adapter
/// stores them in the firing outcome and the handle surfaces them via `get`.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task unit has no payload attached, or its payload kind could not
    /// be resolved. Fatal for the firing, captured not thrown.
    #[error("task misconfigured: {0}")]
    Configuration(String),

    /// The payload returned an error or panicked during invocation.
    #[error("task execution failed: {0}")]
    ExecutionFailed(#[source] PayloadError),

    /// The trigger engine could not invoke the task at its fire time.
    #[error("trigger engine reported a misfire")]
    Misfire,
}

/// Errors surfaced to a consumer blocked in `get` / `get_timeout`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GetError {
    /// The most recently completed firing failed; wraps the captured error.
    #[error("scheduled task failed: {0}")]
    Failed(Arc<TaskError>),

    /// The schedule was cancelled before a result was produced.
    #[error("scheduled task was cancelled")]
    Cancelled,

    /// The timed wait expired with no completed firing. Handle state is
    /// untouched.
    #[error("timed out waiting for a task result")]
    Timeout,

    /// The wait was interrupted (handle teardown). Not a cancellation.
    #[error("interrupted while waiting for a task result")]
    Interrupted,
}

impl From<vigil_sync::WaitError> for GetError {
    fn from(err: vigil_sync::WaitError) -> Self {
        match err {
            vigil_sync::WaitError::Timeout => GetError::Timeout,
            vigil_sync::WaitError::Interrupted => GetError::Interrupted,
        }
    }
}

/// Errors reported by the external trigger engine.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// No schedule is registered under the given key.
    #[error("no schedule registered for task {0}")]
    UnknownTask(TaskKey),

    /// The engine rejected or failed the operation.
    #[error("trigger engine error: {0}")]
    Engine(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_error_mapping() {
        assert!(matches!(
            GetError::from(vigil_sync::WaitError::Timeout),
            GetError::Timeout
        ));
        assert!(matches!(
            GetError::from(vigil_sync::WaitError::Interrupted),
            GetError::Interrupted
        ));
    }

    #[test]
    fn test_failed_error_carries_source_message() {
        let err = GetError::Failed(Arc::new(TaskError::ExecutionFailed(PayloadError::msg(
            "Boom",
        ))));
        assert!(err.to_string().contains("Boom"));
    }
}
