use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use jobtree::exec::{BoxedDelay, BoxedWork, ExecutorBackend, TokioExecutor};

/// An executor backend that records what is submitted to it while
/// delegating to the real Tokio backend.
///
/// Lets tests assert that all work and every delay flow through the
/// backend seam rather than reaching Tokio directly.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    inner: TokioExecutor,
    submitted: AtomicUsize,
    delays: Mutex<Vec<Duration>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units of work submitted so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Every delay requested so far, in request order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ExecutorBackend for RecordingExecutor {
    fn submit(&self, work: BoxedWork) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.inner.submit(work);
    }

    fn delay(&self, duration: Duration) -> BoxedDelay {
        self.delays
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(duration);
        self.inner.delay(duration)
    }
}
