//! Trigger engine interface
//!
//! Fire-time computation lives in an external cron-style engine; this core
//! only consumes its unschedule operation and implements the inbound
//! callbacks on the handle (`on_fired`, `on_completed`, `on_misfired`,
//! `veto_check`).
//!
//! Engine contract, per firing:
//! 1. call `veto_check()`; if true, skip this firing entirely (no `on_fired`,
//!    no adapter invocation) and keep computing future fire times;
//! 2. call `on_fired()`;
//! 3. invoke the task unit on a worker thread, collecting a `FiringOutcome`;
//! 4. call `on_completed(outcome, has_next)` where `has_next` is true iff
//!    more fire times remain.
//!
//! If the engine could not invoke the unit at its fire time it calls
//! `on_misfired(has_next)` instead of steps 2-4.

use crate::error::TriggerError;

/// Identity of one registered schedule, issued by the engine at
/// registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    /// Task identifier within its group.
    pub task_id: String,
    /// Group the task was registered under.
    pub group_id: String,
}

impl TaskKey {
    /// Build a key from a group and task id.
    pub fn new(group_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            group_id: group_id.into(),
        }
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group_id, self.task_id)
    }
}

/// The external trigger-scheduling engine, as consumed by this core.
///
/// Cancellation is cooperative: the handle calls `unschedule` and trusts the
/// engine to stop future invocations. There is no independent enforcement.
pub trait TriggerEngine: Send + Sync {
    /// Stop all future firings of the schedule behind `key`.
    fn unschedule(&self, key: &TaskKey) -> Result<(), TriggerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_is_group_slash_task() {
        let key = TaskKey::new("collectors", "cpu-probe");
        assert_eq!(key.to_string(), "collectors/cpu-probe");
    }

    #[test]
    fn test_key_equality_and_hash() {
        use std::collections::HashSet;

        let a = TaskKey::new("g", "t");
        let b = TaskKey::new("g", "t");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
