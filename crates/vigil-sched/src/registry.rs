//! Management registry for live scheduled tasks.
//!
//! Handles register themselves under their `TaskKey` so operational tooling
//! can enumerate live schedules, inspect counters, pause/resume and cancel
//! without holding a typed reference. Entries are removed on cancellation
//! and on fire-time exhaustion.

use dashmap::DashMap;
use std::sync::Arc;

use crate::counters::CounterSnapshot;
use crate::trigger::TaskKey;

/// Type-erased management view of a live scheduled task.
///
/// `ScheduledTaskHandle<V>` implements this for every `V`, letting one
/// registry hold handles of heterogeneous value types. Listener registration
/// is not part of this view: a `TaskListener<V>` receives the typed result
/// value, so listeners attach through the typed handle.
pub trait ManagedTask: Send + Sync {
    /// The schedule's identity.
    fn key(&self) -> TaskKey;
    /// Point-in-time copy of the cumulative counters.
    fn counters(&self) -> CounterSnapshot;
    /// Elapsed wall-clock time of the last completed firing, in ms.
    fn last_execution_millis(&self) -> u64;
    /// Whether firings are currently vetoed.
    fn is_paused(&self) -> bool;
    /// Toggle the firing veto.
    fn set_paused(&self, paused: bool);
    /// Cancel the schedule. Returns true if this call cancelled it.
    fn cancel_task(&self) -> bool;
}

/// Concurrent registry of live scheduled tasks, keyed by `TaskKey`.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskKey, Arc<dyn ManagedTask>>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a task under its key, replacing any previous entry.
    pub fn register(&self, task: Arc<dyn ManagedTask>) {
        let key = task.key();
        tracing::debug!(task = %key, "task registered");
        self.tasks.insert(key, task);
    }

    /// Remove a task. Returns the entry if it was registered.
    pub fn unregister(&self, key: &TaskKey) -> Option<Arc<dyn ManagedTask>> {
        let removed = self.tasks.remove(key).map(|(_, task)| task);
        if removed.is_some() {
            tracing::debug!(task = %key, "task unregistered");
        }
        removed
    }

    /// Look up a live task.
    pub fn get(&self, key: &TaskKey) -> Option<Arc<dyn ManagedTask>> {
        self.tasks.get(key).map(|entry| entry.value().clone())
    }

    /// Keys of all live tasks, in no particular order.
    pub fn keys(&self) -> Vec<TaskKey> {
        self.tasks.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when no tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("len", &self.tasks.len())
            .finish()
    }
}
