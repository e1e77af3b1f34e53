// src/handle/job.rs

//! Public handle for a launched job.

use std::sync::Arc;

use crate::tree::node::JobNode;
use crate::types::{CancelReason, CompletionKind, FailureCause, JobId, JobState};

/// Handle to a job in the tree.
///
/// Cheap to clone; all clones refer to the same node and observe the same
/// terminal outcome. Dropping every handle does not cancel the job; the
/// tree, not the handle, owns the node.
#[derive(Debug, Clone)]
pub struct JobHandle {
    node: Arc<JobNode>,
}

impl JobHandle {
    pub(crate) fn new(node: Arc<JobNode>) -> Self {
        Self { node }
    }

    pub fn id(&self) -> JobId {
        self.node.id()
    }

    pub fn state(&self) -> JobState {
        self.node.state()
    }

    /// Running normally: no cancellation pending, not terminal.
    pub fn is_active(&self) -> bool {
        self.node.is_active()
    }

    /// Cancellation has been requested or concluded. A job that *failed*
    /// is not reported here; inspect [`JobHandle::state`] or
    /// [`JobHandle::outcome`] for that.
    pub fn is_cancelled(&self) -> bool {
        self.node.cancel_requested()
    }

    /// Terminal outcome, if the job has reached one.
    pub fn outcome(&self) -> Option<CompletionKind> {
        self.node.outcome()
    }

    /// Captured failure; `Some` iff the job has Failed.
    pub fn failure_cause(&self) -> Option<FailureCause> {
        self.node.failure_cause()
    }

    /// Request cooperative cancellation of this job and its whole subtree.
    ///
    /// Idempotent. Returns immediately; the body observes the request at
    /// its next suspension point or explicit checkpoint. Never affects the
    /// job's parent or siblings.
    pub fn cancel(&self) {
        self.node.request_cancel(CancelReason::default());
    }

    /// Like [`JobHandle::cancel`] with an explicit reason. The first
    /// recorded reason wins if several arrive.
    pub fn cancel_with_reason(&self, reason: impl Into<CancelReason>) {
        self.node.request_cancel(reason.into());
    }

    /// Suspend until the job reaches a terminal state.
    ///
    /// Never raises: cancellation and failure are swallowed here. Callers
    /// that need failure visibility inspect [`JobHandle::outcome`]
    /// afterwards, or use a deferred's `await_result`.
    pub async fn join(&self) {
        let _ = self.node.wait_terminal().await;
    }

    /// Request cancellation, then wait for the subtree to finish unwinding.
    pub async fn cancel_and_join(&self) {
        self.cancel();
        self.join().await;
    }

    /// Suspend until terminal and return the outcome.
    pub async fn join_outcome(&self) -> CompletionKind {
        self.node.wait_terminal().await
    }

    /// Register `callback` to run exactly once when the job becomes
    /// terminal, after all of its children have too. Callbacks fire in
    /// registration order; registering on an already-terminal job fires
    /// immediately.
    pub fn invoke_on_completion(&self, callback: impl FnOnce(CompletionKind) + Send + 'static) {
        self.node.add_listener(Box::new(callback));
    }
}
