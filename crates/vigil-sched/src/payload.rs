//! Task payloads
//!
//! A scheduled unit of work is one of three payload kinds: a value-producing
//! call, a fire-and-forget effect, or a self-describing execution unit. The
//! kind is a tagged union so the adapter dispatches totally; the
//! missing-payload case lives on the task unit, not here.

/// Error returned by a payload invocation.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// A plain failure message (also used for captured panics).
    #[error("{0}")]
    Message(String),

    /// An underlying error from the payload's own domain.
    #[error(transparent)]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl PayloadError {
    /// Build a message-only payload error.
    pub fn msg(message: impl Into<String>) -> Self {
        PayloadError::Message(message.into())
    }
}

/// A self-describing unit of work.
///
/// The description is used in logs and the management surface; `execute` runs
/// one firing's worth of work.
pub trait ExecutionUnit<V>: Send {
    /// Run the unit once, producing a value or an error.
    fn execute(&mut self) -> Result<V, PayloadError>;

    /// Human-readable description of the unit.
    fn description(&self) -> &str {
        "execution unit"
    }
}

/// The caller-supplied work behind a schedule, tagged by kind.
pub enum TaskPayload<V> {
    /// Value-producing call; its return value is captured into the firing.
    Producer(Box<dyn FnMut() -> Result<V, PayloadError> + Send>),

    /// Fire-and-forget effect; no value is captured.
    Effect(Box<dyn FnMut() -> Result<(), PayloadError> + Send>),

    /// Self-describing execution unit.
    Unit(Box<dyn ExecutionUnit<V>>),
}

impl<V> TaskPayload<V> {
    /// Wrap a value-producing closure.
    pub fn producer<F>(f: F) -> Self
    where
        F: FnMut() -> Result<V, PayloadError> + Send + 'static,
    {
        TaskPayload::Producer(Box::new(f))
    }

    /// Wrap a fire-and-forget effect.
    pub fn effect<F>(f: F) -> Self
    where
        F: FnMut() -> Result<(), PayloadError> + Send + 'static,
    {
        TaskPayload::Effect(Box::new(f))
    }

    /// Wrap a self-describing execution unit.
    pub fn unit<U>(unit: U) -> Self
    where
        U: ExecutionUnit<V> + 'static,
    {
        TaskPayload::Unit(Box::new(unit))
    }

    /// The payload kind tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskPayload::Producer(_) => "producer",
            TaskPayload::Effect(_) => "effect",
            TaskPayload::Unit(_) => "unit",
        }
    }
}

impl<V> std::fmt::Debug for TaskPayload<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPayload::Unit(unit) => write!(f, "TaskPayload::Unit({})", unit.description()),
            other => write!(f, "TaskPayload::{}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl ExecutionUnit<i32> for Probe {
        fn execute(&mut self) -> Result<i32, PayloadError> {
            Ok(7)
        }

        fn description(&self) -> &str {
            "probe"
        }
    }

    #[test]
    fn test_payload_kind_tags() {
        assert_eq!(TaskPayload::producer(|| Ok(1)).kind(), "producer");
        assert_eq!(TaskPayload::<i32>::effect(|| Ok(())).kind(), "effect");
        assert_eq!(TaskPayload::unit(Probe).kind(), "unit");
    }

    #[test]
    fn test_unit_debug_uses_description() {
        let payload = TaskPayload::unit(Probe);
        assert_eq!(format!("{:?}", payload), "TaskPayload::Unit(probe)");
    }

    #[test]
    fn test_payload_error_message() {
        let err = PayloadError::msg("collector offline");
        assert_eq!(err.to_string(), "collector offline");
    }
}
