//! Task lifecycle states
//!
//! The state is owned exclusively by the handle and mutated only inside the
//! firing-callback path or `cancel`. `Fired` is a transient marker between
//! payload return and completion bookkeeping.

/// Lifecycle state of a scheduled task.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Scheduled but never fired
    Unfired,
    /// A firing is currently in flight
    Firing,
    /// The payload returned; completion bookkeeping not yet finished
    Fired,
    /// Final firing completed successfully (terminal)
    Completed,
    /// Final firing failed (terminal)
    ExceptionRaised,
    /// A firing completed successfully and more fire times remain
    CompletedContinuing,
    /// A firing failed and more fire times remain
    ExceptionContinuing,
    /// The schedule was cancelled (terminal)
    Cancelled,
}

impl TaskState {
    /// True for states with no further firings: `Completed`,
    /// `ExceptionRaised`, `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::ExceptionRaised | TaskState::Cancelled
        )
    }

    /// True for the between-firings states of a recurring schedule.
    pub fn is_continuing(self) -> bool {
        matches!(
            self,
            TaskState::CompletedContinuing | TaskState::ExceptionContinuing
        )
    }
}

/// Whether a schedule fires once or repeatedly.
///
/// Controls cancellation semantics: a one-shot schedule can only be cancelled
/// before its single firing, a recurring schedule can always be cancelled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Fires exactly once
    OneShot,
    /// Fires repeatedly until the trigger exhausts its fire times
    Recurring,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::ExceptionRaised.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());

        assert!(!TaskState::Unfired.is_terminal());
        assert!(!TaskState::Firing.is_terminal());
        assert!(!TaskState::Fired.is_terminal());
        assert!(!TaskState::CompletedContinuing.is_terminal());
        assert!(!TaskState::ExceptionContinuing.is_terminal());
    }

    #[test]
    fn test_continuing_states() {
        assert!(TaskState::CompletedContinuing.is_continuing());
        assert!(TaskState::ExceptionContinuing.is_continuing());
        assert!(!TaskState::Firing.is_continuing());
        assert!(!TaskState::Completed.is_continuing());
    }
}
