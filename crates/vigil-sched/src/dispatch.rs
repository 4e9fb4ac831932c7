//! Worker-submission interface for listener dispatch
//!
//! Listener callbacks never run on the firing thread; every event is
//! submitted to an externally supplied worker pool. Pool sizing and thread
//! management are the pool's concern, not this core's.

use std::sync::atomic::{AtomicU64, Ordering};

/// A unit of dispatch work.
pub type DispatchJob = Box<dyn FnOnce() + Send>;

/// Disposable handle returned from a submission.
///
/// Cancellation of queued jobs is the pool's concern; the dispatcher
/// discards tickets after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionTicket(u64);

impl SubmissionTicket {
    /// Issue a new unique ticket.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The ticket's numeric id.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl Default for SubmissionTicket {
    fn default() -> Self {
        Self::new()
    }
}

/// An externally supplied worker pool, consumed only for listener dispatch.
pub trait DispatchPool: Send + Sync {
    /// Submit a job for asynchronous execution.
    fn submit(&self, job: DispatchJob) -> SubmissionTicket;
}

/// A dispatch pool that runs jobs on the calling thread.
///
/// For bootstrap and tests only: it gives up the never-on-the-firing-thread
/// guarantee that a real pool provides.
#[derive(Debug, Default)]
pub struct InlineDispatch;

impl DispatchPool for InlineDispatch {
    fn submit(&self, job: DispatchJob) -> SubmissionTicket {
        job();
        SubmissionTicket::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_tickets_are_unique() {
        let a = SubmissionTicket::new();
        let b = SubmissionTicket::new();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_inline_dispatch_runs_the_job() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        InlineDispatch.submit(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst));
    }
}
