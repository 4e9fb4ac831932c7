//! Scheduled task execution and result continuation.
//!
//! This crate sits between a trigger engine (which computes fire times) and
//! consumers of scheduled work. A [`ScheduledTaskHandle`] is a multi-fire
//! continuation: unlike a one-shot future it stays live across repeated
//! firings, captures each firing's value or error, and exposes two
//! independent blocking points via [`vigil_sync::Gate`]:
//!
//! - [`ScheduledTaskHandle::get`] blocks while a firing is in flight and
//!   returns the most recently completed firing's outcome;
//! - [`ScheduledTaskHandle::wait_on_next_execution`] blocks until the next
//!   firing starts.
//!
//! [`TaskUnit`] adapts application payloads to the engine's invocation
//! surface under a strict capture contract: the payload's value, error or
//! panic is always folded into a [`FiringOutcome`], never thrown across the
//! engine boundary. Lifecycle observers register [`TaskListener`]s, which
//! are notified asynchronously through a [`DispatchPool`]. Live handles are
//! enumerable through a [`TaskRegistry`].

#![warn(missing_docs)]

mod adapter;
mod counters;
mod dispatch;
mod error;
mod handle;
mod listener;
mod payload;
mod registry;
mod state;
mod trigger;

pub use adapter::{FiringOutcome, TaskUnit};
pub use counters::CounterSnapshot;
pub use dispatch::{DispatchJob, DispatchPool, InlineDispatch, SubmissionTicket};
pub use error::{GetError, TaskError, TriggerError};
pub use handle::ScheduledTaskHandle;
pub use listener::{ListenerId, TaskEvent, TaskListener};
pub use payload::{ExecutionUnit, PayloadError, TaskPayload};
pub use registry::{ManagedTask, TaskRegistry};
pub use state::{ScheduleKind, TaskState};
pub use trigger::{TaskKey, TriggerEngine};

pub use vigil_sync::WaitError;
