// src/tree/node.rs

//! Shared job node: the async/concurrent shell around the pure
//! [`Lifecycle`] machine.
//!
//! Responsibilities:
//! - own the per-node mutex guarding lifecycle state, child set and
//!   listeners (node-local exclusion; the tree has no global lock)
//! - execute the [`LifecycleAction`]s the pure core returns
//! - expose watch channels for "cancellation requested" and "terminal"
//!   so bodies and joiners can suspend without polling
//!
//! Locking discipline: a node's lock is **never** held while calling into a
//! parent or child. Every tree-edge call (cancelling children, notifying
//! the parent of a terminal child) happens on a snapshot taken under the
//! lock, after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::errors::{Error, JobError, Result};
use crate::tree::lifecycle::{
    BodyKind, Lifecycle, LifecycleAction, LifecycleEvent, LifecycleStep,
};
use crate::tree::propagate;
use crate::types::{CancelReason, CompletionKind, FailureCause, JobId, JobState, SupervisionMode};

/// Completion callback, invoked exactly once with the terminal outcome.
pub type CompletionListener = Box<dyn FnOnce(CompletionKind) + Send + 'static>;

/// Handler for failures that no awaiter will observe.
pub type FailureHandler = dyn Fn(&FailureCause) + Send + Sync + 'static;

/// One node in the job tree.
pub struct JobNode {
    id: JobId,
    mode: SupervisionMode,
    depth: usize,
    parent: Weak<JobNode>,
    /// Exception handler inherited from the creating scope, if any.
    handler: Option<Arc<FailureHandler>>,
    /// Whether a failure of this node is delivered directly to some caller
    /// (deferred `await_result`, or the `supervisor_scope` return value),
    /// which exempts it from unobserved-failure reporting.
    direct_observer: bool,
    inner: Mutex<Inner>,
    /// Flips to `true` when cancellation is requested; never reset.
    cancel_tx: watch::Sender<bool>,
    /// Flips to `true` when the node reaches a terminal state.
    terminal_tx: watch::Sender<bool>,
}

struct Inner {
    lifecycle: Lifecycle,
    children: HashMap<JobId, Arc<JobNode>>,
    listeners: Vec<CompletionListener>,
    outcome: Option<CompletionKind>,
}

impl JobNode {
    /// Create a detached root container (a scope root).
    pub(crate) fn new_root(
        mode: SupervisionMode,
        handler: Option<Arc<FailureHandler>>,
    ) -> Arc<Self> {
        let node = Arc::new(Self::bare(
            mode,
            0,
            Weak::new(),
            handler,
            false,
            BodyKind::Container,
        ));
        debug!(job = %node.id, ?mode, "root scope created");
        node
    }

    fn bare(
        mode: SupervisionMode,
        depth: usize,
        parent: Weak<JobNode>,
        handler: Option<Arc<FailureHandler>>,
        direct_observer: bool,
        kind: BodyKind,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        let (terminal_tx, _) = watch::channel(false);
        Self {
            id: JobId::next(),
            mode,
            depth,
            parent,
            handler,
            direct_observer,
            inner: Mutex::new(Inner {
                lifecycle: Lifecycle::new(kind),
                children: HashMap::new(),
                listeners: Vec::new(),
                outcome: None,
            }),
            cancel_tx,
            terminal_tx,
        }
    }

    /// Attach a new child under this node.
    ///
    /// Fails if this node is no longer accepting children (cancelling or
    /// terminal) or if the configured depth limit would be exceeded.
    pub(crate) fn spawn_child(
        self: &Arc<Self>,
        mode: Option<SupervisionMode>,
        direct_observer: bool,
        kind: BodyKind,
        max_depth: Option<usize>,
    ) -> Result<Arc<JobNode>> {
        if let Some(limit) = max_depth {
            if self.depth + 1 > limit {
                return Err(Error::DepthLimit(limit));
            }
        }

        let mut inner = self.lock();
        if !inner.lifecycle.accepts_children() {
            return Err(Error::ScopeClosed {
                job: self.id,
                state: inner.lifecycle.state(),
            });
        }

        let child = Arc::new(Self::bare(
            mode.unwrap_or(self.mode),
            self.depth + 1,
            Arc::downgrade(self),
            self.handler.clone(),
            direct_observer,
            kind,
        ));
        inner.lifecycle.child_spawned();
        inner.children.insert(child.id, Arc::clone(&child));
        trace!(parent = %self.id, child = %child.id, "child attached");
        Ok(child)
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    pub(crate) fn mode(&self) -> SupervisionMode {
        self.mode
    }

    pub(crate) fn parent(&self) -> Option<Arc<JobNode>> {
        self.parent.upgrade()
    }

    pub(crate) fn has_direct_observer(&self) -> bool {
        self.direct_observer
    }

    pub(crate) fn state(&self) -> JobState {
        self.lock().lifecycle.state()
    }

    /// Active means running normally: no cancellation pending, not terminal.
    pub(crate) fn is_active(&self) -> bool {
        matches!(self.state(), JobState::Active | JobState::Completing)
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.lock().lifecycle.cancel_requested()
    }

    pub(crate) fn outcome(&self) -> Option<CompletionKind> {
        self.lock().outcome.clone()
    }

    pub(crate) fn failure_cause(&self) -> Option<FailureCause> {
        self.lock().lifecycle.failure_cause()
    }

    /// The cancellation signal a body raises when it observes cancellation.
    pub(crate) fn cancellation_error(&self) -> JobError {
        JobError::Cancelled(self.lock().lifecycle.effective_cancel_reason())
    }

    pub(crate) fn subscribe_cancel(&self) -> watch::Receiver<bool> {
        self.cancel_tx.subscribe()
    }

    pub(crate) fn subscribe_terminal(&self) -> watch::Receiver<bool> {
        self.terminal_tx.subscribe()
    }

    /// Suspend until this node is terminal and return its outcome.
    pub(crate) async fn wait_terminal(&self) -> CompletionKind {
        let mut rx = self.subscribe_terminal();
        // The sender lives inside `self`, so this cannot error while we
        // hold a reference; swallow the impossible branch anyway.
        let _ = rx.wait_for(|terminal| *terminal).await;
        self.outcome().unwrap_or(CompletionKind::Completed)
    }

    /// Register a completion listener, firing immediately if already
    /// terminal.
    pub(crate) fn add_listener(&self, listener: CompletionListener) {
        let mut pending = Some(listener);
        let fire_now = {
            let mut inner = self.lock();
            match inner.outcome.clone() {
                Some(kind) => Some(kind),
                None => {
                    if let Some(listener) = pending.take() {
                        inner.listeners.push(listener);
                    }
                    None
                }
            }
        };
        if let (Some(kind), Some(listener)) = (fire_now, pending.take()) {
            listener(kind);
        }
    }

    /// Cancellation propagator entry point: cancel this node and its whole
    /// subtree, depth-first. Idempotent; never touches parent or siblings.
    pub(crate) fn request_cancel(self: &Arc<Self>, reason: CancelReason) {
        trace!(job = %self.id, %reason, "cancellation requested");
        self.step_and_apply(LifecycleEvent::CancelRequested(reason));
    }

    /// Cancel this node because a descendant failed; the failure becomes
    /// this node's cause unless one is already recorded.
    pub(crate) fn fail_cancel(self: &Arc<Self>, cause: FailureCause) {
        self.step_and_apply(LifecycleEvent::FailureCancelRequested(cause));
    }

    /// The body finished; failures are handed to the failure propagator.
    pub(crate) fn body_finished(self: &Arc<Self>, result: std::result::Result<(), JobError>) {
        match result {
            Ok(()) => self.step_and_apply(LifecycleEvent::BodyCompleted),
            Err(JobError::Cancelled(_)) => self.step_and_apply(LifecycleEvent::BodyCancelled),
            Err(JobError::Failed(cause)) => {
                warn!(job = %self.id, %cause, "job body failed");
                // Record the failure, then walk the supervision chain
                // *before* applying the terminal cascade: the parent must
                // still count this node as a live child when the failure
                // reaches it, or a parent waiting in Completing finishes
                // Completed while ancestors above it fail.
                let step = {
                    let mut inner = self.lock();
                    inner.lifecycle.step(LifecycleEvent::BodyFailed(cause.clone()))
                };
                propagate::propagate_failure(self, cause);
                self.apply(step);
            }
        }
    }

    /// Like [`JobNode::body_finished`], but a failure is *not* propagated
    /// through the tree because the caller receives it directly (used by
    /// `supervisor_scope`, whose body result is returned to its caller).
    pub(crate) fn body_finished_observed(
        self: &Arc<Self>,
        result: std::result::Result<(), JobError>,
    ) {
        match result {
            Ok(()) => self.step_and_apply(LifecycleEvent::BodyCompleted),
            Err(JobError::Cancelled(_)) => self.step_and_apply(LifecycleEvent::BodyCancelled),
            Err(JobError::Failed(cause)) => {
                self.step_and_apply(LifecycleEvent::BodyFailed(cause));
            }
        }
    }

    /// Report an unobserved failure through this node's handler, or the
    /// process-wide fallback if none is registered.
    pub(crate) fn report_failure(&self, cause: &FailureCause) {
        match &self.handler {
            Some(handler) => handler(cause),
            None => {
                tracing::error!(job = %self.id, %cause, "unobserved job failure");
            }
        }
    }

    fn step_and_apply(self: &Arc<Self>, event: LifecycleEvent) {
        let step = {
            let mut inner = self.lock();
            inner.lifecycle.step(event)
        };
        self.apply(step);
    }

    /// Execute the actions the pure core returned. Runs with the node's
    /// lock released; see the module docs for the locking discipline.
    fn apply(self: &Arc<Self>, step: LifecycleStep) {
        for action in step.actions {
            match action {
                LifecycleAction::NotifyCancellation => {
                    // `send_replace` stores the value even with no live
                    // receivers; a body that subscribes later must still
                    // see the request.
                    self.cancel_tx.send_replace(true);
                }
                LifecycleAction::CancelChildren(reason) => {
                    // Snapshot, then cancel outside the lock. No child can
                    // attach after this point: the node stopped accepting
                    // children when it entered Cancelling.
                    let children: Vec<Arc<JobNode>> =
                        { self.lock().children.values().cloned().collect() };
                    for child in children {
                        child.request_cancel(reason.clone());
                    }
                }
                LifecycleAction::BecameTerminal(kind) => self.on_terminal(kind),
            }
        }
    }

    fn on_terminal(self: &Arc<Self>, kind: CompletionKind) {
        let listeners = {
            let mut inner = self.lock();
            debug_assert!(inner.children.is_empty());
            inner.outcome = Some(kind.clone());
            std::mem::take(&mut inner.listeners)
        };

        debug!(job = %self.id, state = ?self.state(), "job reached terminal state");
        // Stored even with no live receivers, so joiners arriving after
        // the transition still observe it.
        self.terminal_tx.send_replace(true);

        for listener in listeners {
            listener(kind.clone());
        }

        if let Some(parent) = self.parent.upgrade() {
            parent.on_child_terminal(self.id);
        }
    }

    /// A child reached a terminal state: drop it from the child set and let
    /// the lifecycle re-evaluate the join-all-children barrier.
    fn on_child_terminal(self: &Arc<Self>, child: JobId) {
        let step = {
            let mut inner = self.lock();
            let removed = inner.children.remove(&child);
            debug_assert!(removed.is_some(), "terminal child {child} not in child set");
            inner.lifecycle.step(LifecycleEvent::ChildTerminal)
        };
        self.apply(step);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-update of
        // plain data; recover the guard.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for JobNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobNode")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("depth", &self.depth)
            .field("state", &self.state())
            .finish()
    }
}
