//! Lifecycle listeners and asynchronous fan-out
//!
//! Listeners observe firings, completions, failures, vetoes and
//! cancellation. Registration is lock-free; every event is delivered through
//! the external dispatch pool so slow or failing listener code never delays
//! the firing thread or a gate flip. Listener panics are caught inside the
//! dispatched job, logged, and swallowed.

use dashmap::DashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dispatch::DispatchPool;
use crate::trigger::TaskKey;

/// Unique identifier for a registered listener.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Observer of one schedule's lifecycle events.
///
/// All methods have empty default bodies; implement the ones you care about.
/// Counts are the cumulative post-event values.
pub trait TaskListener<V>: Send + Sync {
    /// A firing started.
    fn on_fired(&self, _key: &TaskKey, _fire_count: u64) {}

    /// A firing completed successfully. `result` is `None` for effect
    /// payloads.
    fn on_completed(&self, _key: &TaskKey, _result: Option<V>, _complete_count: u64) {}

    /// A firing failed (payload error or misfire).
    fn on_failed(&self, _key: &TaskKey, _fail_count: u64) {}

    /// A firing was skipped by the veto policy.
    fn on_vetoed(&self, _key: &TaskKey, _veto_count: u64) {}

    /// The schedule was cancelled or exhausted its fire times.
    fn on_cancelled(&self, _key: &TaskKey) {}
}

/// One lifecycle event, as fanned out to listeners.
#[derive(Debug, Clone)]
pub enum TaskEvent<V> {
    /// A firing started.
    Fired {
        /// Cumulative fire count including this firing.
        fire_count: u64,
    },
    /// A firing completed successfully.
    Completed {
        /// The captured result, if the payload produces one.
        result: Option<V>,
        /// Cumulative successful-completion count.
        complete_count: u64,
    },
    /// A firing failed.
    Failed {
        /// Cumulative failure count.
        fail_count: u64,
    },
    /// A firing was vetoed.
    Vetoed {
        /// Cumulative veto count.
        veto_count: u64,
    },
    /// The schedule ended.
    Cancelled,
}

/// Registry of listeners for one schedule.
pub struct ListenerRegistry<V> {
    listeners: DashMap<ListenerId, Arc<dyn TaskListener<V>>>,
}

impl<V> ListenerRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
        }
    }

    /// Register a listener, returning its id for later removal.
    pub fn add(&self, listener: Arc<dyn TaskListener<V>>) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.insert(id, listener);
        id
    }

    /// Remove a listener. Returns true if it was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Fan one event out to every registered listener through the pool.
    ///
    /// One submission per listener; a listener panic is contained to its own
    /// dispatch job.
    pub(crate) fn notify(&self, pool: &Arc<dyn DispatchPool>, key: &TaskKey, event: TaskEvent<V>) {
        for entry in self.listeners.iter() {
            let listener = entry.value().clone();
            let key = key.clone();
            let event = event.clone();
            pool.submit(Box::new(move || {
                let delivery =
                    panic::catch_unwind(AssertUnwindSafe(|| deliver(&*listener, &key, event)));
                if delivery.is_err() {
                    tracing::warn!(task = %key, "task listener panicked during dispatch");
                }
            }));
        }
    }
}

impl<V> Default for ListenerRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn deliver<V>(listener: &dyn TaskListener<V>, key: &TaskKey, event: TaskEvent<V>) {
    match event {
        TaskEvent::Fired { fire_count } => listener.on_fired(key, fire_count),
        TaskEvent::Completed {
            result,
            complete_count,
        } => listener.on_completed(key, result, complete_count),
        TaskEvent::Failed { fail_count } => listener.on_failed(key, fail_count),
        TaskEvent::Vetoed { veto_count } => listener.on_vetoed(key, veto_count),
        TaskEvent::Cancelled => listener.on_cancelled(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::InlineDispatch;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        fired: AtomicUsize,
        completed: AtomicUsize,
        cancelled: AtomicUsize,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                cancelled: AtomicUsize::new(0),
            })
        }
    }

    impl TaskListener<i32> for Recorder {
        fn on_fired(&self, _key: &TaskKey, _fire_count: u64) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }

        fn on_completed(&self, _key: &TaskKey, result: Option<i32>, _complete_count: u64) {
            assert_eq!(result, Some(42));
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_cancelled(&self, _key: &TaskKey) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pool() -> Arc<dyn DispatchPool> {
        Arc::new(InlineDispatch)
    }

    #[test]
    fn test_add_remove() {
        let registry = ListenerRegistry::<i32>::new();
        assert!(registry.is_empty());

        let id = registry.add(Recorder::new());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id));
        assert!(!registry.remove(id)); // second removal is a no-op
        assert!(registry.is_empty());
    }

    #[test]
    fn test_events_reach_every_listener() {
        let registry = ListenerRegistry::<i32>::new();
        let first = Recorder::new();
        let second = Recorder::new();
        registry.add(first.clone());
        registry.add(second.clone());

        let key = TaskKey::new("g", "t");
        let pool = pool();
        registry.notify(&pool, &key, TaskEvent::Fired { fire_count: 1 });
        registry.notify(
            &pool,
            &key,
            TaskEvent::Completed {
                result: Some(42),
                complete_count: 1,
            },
        );
        registry.notify(&pool, &key, TaskEvent::Cancelled);

        for recorder in [first, second] {
            assert_eq!(recorder.fired.load(Ordering::SeqCst), 1);
            assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
            assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_listener_panic_is_swallowed() {
        struct Exploding;
        impl TaskListener<i32> for Exploding {
            fn on_fired(&self, _key: &TaskKey, _fire_count: u64) {
                panic!("listener bug");
            }
        }

        let registry = ListenerRegistry::<i32>::new();
        registry.add(Arc::new(Exploding));
        let survivor = Recorder::new();
        registry.add(survivor.clone());

        let key = TaskKey::new("g", "t");
        registry.notify(&pool(), &key, TaskEvent::Fired { fire_count: 1 });

        // The panicking listener did not take the healthy one down
        assert_eq!(survivor.fired.load(Ordering::SeqCst), 1);
    }
}
