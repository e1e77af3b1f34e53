// src/tree/lifecycle.rs

//! Pure lifecycle state machine for a single job node.
//!
//! This module contains a synchronous, deterministic state machine that
//! consumes [`LifecycleEvent`]s and produces:
//! - an updated state
//! - a list of [`LifecycleAction`]s describing what the async shell
//!   ([`crate::tree::node`]) should do next
//!
//! The shell is responsible for locks, watch channels, listener callbacks
//! and walking tree edges; none of that appears here. The machine is
//! intended to be extensively unit- and property-tested without any Tokio,
//! channels, or threads.
//!
//! State graph:
//!
//! ```text
//! Active ──body ok──▶ Completing ──children drained──▶ Completed
//!   │  │
//!   │  └──body failed, no children──▶ Failed
//!   │
//!   └──cancel / propagated failure──▶ Cancelling ──drained──▶ Cancelled
//!                                                        └──▶ Failed (failure cause wins)
//! ```
//!
//! The first recorded cause wins; later cancellations or failures never
//! overwrite it.

use crate::types::{CancelReason, CompletionKind, FailureCause, JobState};

/// Whether the node has a body of its own.
///
/// Scope roots are `Container` nodes: they never complete on their own and
/// only leave `Active` when cancelled. Every launched job is `Scoped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Scoped,
    Container,
}

/// Events fed into the machine by the shell.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The body returned normally.
    BodyCompleted,
    /// The body unwound with a cancellation signal.
    BodyCancelled,
    /// The body raised a real (non-cancellation) failure.
    BodyFailed(FailureCause),
    /// External cancellation request (handle `cancel`, parent teardown).
    CancelRequested(CancelReason),
    /// Cancellation caused by a propagated child failure; the failure
    /// becomes this node's cause unless one is already set.
    FailureCancelRequested(FailureCause),
    /// One child reached a terminal state and left the child set.
    ChildTerminal,
}

/// Instructions for the shell, in execution order.
#[derive(Debug, Clone)]
pub enum LifecycleAction {
    /// Wake the body's cancellation observers (delay races, checkpoints).
    NotifyCancellation,
    /// Cancel every live child, depth-first, with this reason.
    CancelChildren(CancelReason),
    /// The node just entered this terminal state: fire listeners, notify
    /// joiners, inform the parent.
    BecameTerminal(CompletionKind),
}

/// Result of a single step.
#[derive(Debug, Clone, Default)]
pub struct LifecycleStep {
    pub actions: Vec<LifecycleAction>,
}

/// First recorded reason the node is going down, if any.
#[derive(Debug, Clone)]
enum Cause {
    Cancel(CancelReason),
    Failure(FailureCause),
}

/// The machine itself. One per node, guarded by the node's mutex.
#[derive(Debug)]
pub struct Lifecycle {
    state: JobState,
    cause: Option<Cause>,
    body_done: bool,
    live_children: usize,
    kind: BodyKind,
}

impl Lifecycle {
    pub fn new(kind: BodyKind) -> Self {
        Self {
            state: JobState::Active,
            cause: None,
            // Containers have no body to wait for.
            body_done: matches!(kind, BodyKind::Container),
            live_children: 0,
            kind,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether cancellation has been requested (or concluded).
    pub fn cancel_requested(&self) -> bool {
        matches!(self.state, JobState::Cancelling | JobState::Cancelled)
    }

    pub fn live_children(&self) -> usize {
        self.live_children
    }

    /// New children may only attach while the node is plainly active.
    pub fn accepts_children(&self) -> bool {
        self.state == JobState::Active
    }

    /// Captured failure cause; `Some` iff the node has Failed.
    pub fn failure_cause(&self) -> Option<FailureCause> {
        match (&self.state, &self.cause) {
            (JobState::Failed, Some(Cause::Failure(cause))) => Some(cause.clone()),
            _ => None,
        }
    }

    /// Terminal outcome, once reached.
    pub fn completion_kind(&self) -> Option<CompletionKind> {
        if !self.state.is_terminal() {
            return None;
        }
        Some(match &self.cause {
            None => CompletionKind::Completed,
            Some(Cause::Cancel(reason)) => CompletionKind::Cancelled(reason.clone()),
            Some(Cause::Failure(cause)) => CompletionKind::Failed(cause.clone()),
        })
    }

    /// Reason handed to a body observing cancellation at a suspension point.
    pub fn effective_cancel_reason(&self) -> CancelReason {
        match &self.cause {
            Some(Cause::Cancel(reason)) => reason.clone(),
            Some(Cause::Failure(cause)) => CancelReason::new(format!("failed: {cause}")),
            None => CancelReason::default(),
        }
    }

    /// Record a newly attached child. Caller must have checked
    /// [`Lifecycle::accepts_children`] under the same lock.
    pub fn child_spawned(&mut self) {
        debug_assert!(self.accepts_children());
        self.live_children += 1;
    }

    /// Advance the machine by one event.
    pub fn step(&mut self, event: LifecycleEvent) -> LifecycleStep {
        let mut step = LifecycleStep::default();

        match event {
            LifecycleEvent::BodyCompleted => {
                debug_assert_eq!(self.kind, BodyKind::Scoped);
                self.body_done = true;
                if self.state == JobState::Active {
                    self.state = JobState::Completing;
                }
            }
            LifecycleEvent::BodyCancelled => {
                self.body_done = true;
                if self.state == JobState::Active {
                    // The body cancelled itself without an external request.
                    self.state = JobState::Cancelling;
                    if self.cause.is_none() {
                        self.cause = Some(Cause::Cancel(CancelReason::default()));
                    }
                    step.actions.push(LifecycleAction::CancelChildren(
                        self.effective_cancel_reason(),
                    ));
                }
            }
            LifecycleEvent::BodyFailed(cause) => {
                self.body_done = true;
                if self.cause.is_none() {
                    self.cause = Some(Cause::Failure(cause));
                }
                if self.state == JobState::Active || self.state == JobState::Completing {
                    if self.live_children > 0 {
                        // Children must drain before the node can fail.
                        self.state = JobState::Cancelling;
                        step.actions.push(LifecycleAction::CancelChildren(
                            self.effective_cancel_reason(),
                        ));
                    } else {
                        self.state = JobState::Cancelling;
                    }
                }
            }
            LifecycleEvent::CancelRequested(reason) => {
                // Idempotent: a node already going down (or gone) ignores it.
                if !self.state.is_terminal() && self.state != JobState::Cancelling {
                    self.state = JobState::Cancelling;
                    if self.cause.is_none() {
                        self.cause = Some(Cause::Cancel(reason.clone()));
                    }
                    step.actions.push(LifecycleAction::NotifyCancellation);
                    step.actions
                        .push(LifecycleAction::CancelChildren(reason));
                }
            }
            LifecycleEvent::FailureCancelRequested(cause) => {
                if !self.state.is_terminal() && self.state != JobState::Cancelling {
                    self.state = JobState::Cancelling;
                    if self.cause.is_none() {
                        self.cause = Some(Cause::Failure(cause));
                    }
                    let reason = self.effective_cancel_reason();
                    step.actions.push(LifecycleAction::NotifyCancellation);
                    step.actions.push(LifecycleAction::CancelChildren(reason));
                }
            }
            LifecycleEvent::ChildTerminal => {
                debug_assert!(self.live_children > 0);
                self.live_children = self.live_children.saturating_sub(1);
            }
        }

        self.maybe_finish(&mut step);
        step
    }

    /// Terminal transition once the body is done and children have drained.
    ///
    /// Containers only finish via cancellation; they stay open for new
    /// children otherwise.
    fn maybe_finish(&mut self, step: &mut LifecycleStep) {
        if self.state.is_terminal() {
            return;
        }
        if !self.body_done || self.live_children > 0 {
            return;
        }
        if self.kind == BodyKind::Container && self.state != JobState::Cancelling {
            return;
        }

        self.state = match &self.cause {
            None => JobState::Completed,
            Some(Cause::Cancel(_)) => JobState::Cancelled,
            Some(Cause::Failure(_)) => JobState::Failed,
        };

        let kind = self
            .completion_kind()
            .unwrap_or(CompletionKind::Completed);
        step.actions.push(LifecycleAction::BecameTerminal(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal_kind(step: &LifecycleStep) -> Option<&CompletionKind> {
        step.actions.iter().find_map(|a| match a {
            LifecycleAction::BecameTerminal(kind) => Some(kind),
            _ => None,
        })
    }

    #[test]
    fn plain_body_completes() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        let step = lc.step(LifecycleEvent::BodyCompleted);
        assert_eq!(lc.state(), JobState::Completed);
        assert!(terminal_kind(&step).is_some_and(CompletionKind::is_completed));
    }

    #[test]
    fn parent_waits_for_children_before_completing() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        lc.child_spawned();
        lc.child_spawned();

        let step = lc.step(LifecycleEvent::BodyCompleted);
        assert_eq!(lc.state(), JobState::Completing);
        assert!(terminal_kind(&step).is_none());

        lc.step(LifecycleEvent::ChildTerminal);
        assert_eq!(lc.state(), JobState::Completing);

        let step = lc.step(LifecycleEvent::ChildTerminal);
        assert_eq!(lc.state(), JobState::Completed);
        assert!(terminal_kind(&step).is_some());
    }

    #[test]
    fn cancel_is_idempotent_and_first_reason_wins() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        let step = lc.step(LifecycleEvent::CancelRequested("first".into()));
        assert_eq!(lc.state(), JobState::Cancelling);
        assert!(step
            .actions
            .iter()
            .any(|a| matches!(a, LifecycleAction::NotifyCancellation)));

        let step = lc.step(LifecycleEvent::CancelRequested("second".into()));
        assert!(step.actions.is_empty());
        assert_eq!(lc.effective_cancel_reason().as_str(), "first");

        let step = lc.step(LifecycleEvent::BodyCancelled);
        assert_eq!(lc.state(), JobState::Cancelled);
        match terminal_kind(&step) {
            Some(CompletionKind::Cancelled(reason)) => assert_eq!(reason.as_str(), "first"),
            other => panic!("expected cancelled outcome, got {other:?}"),
        }
    }

    #[test]
    fn body_failure_without_children_fails_directly() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        let step = lc.step(LifecycleEvent::BodyFailed(FailureCause::msg("boom")));
        assert_eq!(lc.state(), JobState::Failed);
        assert!(terminal_kind(&step).is_some_and(CompletionKind::is_failed));
        assert!(lc.failure_cause().is_some());
    }

    #[test]
    fn body_failure_with_children_drains_then_fails() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        lc.child_spawned();

        let step = lc.step(LifecycleEvent::BodyFailed(FailureCause::msg("boom")));
        assert_eq!(lc.state(), JobState::Cancelling);
        assert!(step
            .actions
            .iter()
            .any(|a| matches!(a, LifecycleAction::CancelChildren(_))));

        let step = lc.step(LifecycleEvent::ChildTerminal);
        assert_eq!(lc.state(), JobState::Failed);
        assert!(terminal_kind(&step).is_some_and(CompletionKind::is_failed));
    }

    #[test]
    fn cancellation_never_overwrites_a_failure_cause() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        lc.child_spawned();
        lc.step(LifecycleEvent::BodyFailed(FailureCause::msg("boom")));
        lc.step(LifecycleEvent::CancelRequested("late cancel".into()));

        let step = lc.step(LifecycleEvent::ChildTerminal);
        assert_eq!(lc.state(), JobState::Failed);
        assert!(terminal_kind(&step).is_some_and(CompletionKind::is_failed));
    }

    #[test]
    fn failure_cancel_marks_failed_once_drained() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        lc.step(LifecycleEvent::FailureCancelRequested(FailureCause::msg(
            "child blew up",
        )));
        assert_eq!(lc.state(), JobState::Cancelling);

        let step = lc.step(LifecycleEvent::BodyCancelled);
        assert_eq!(lc.state(), JobState::Failed);
        assert!(terminal_kind(&step).is_some_and(CompletionKind::is_failed));
    }

    #[test]
    fn container_stays_open_until_cancelled() {
        let mut lc = Lifecycle::new(BodyKind::Container);
        lc.child_spawned();
        lc.step(LifecycleEvent::ChildTerminal);
        // Drained, but containers never complete on their own.
        assert_eq!(lc.state(), JobState::Active);

        let step = lc.step(LifecycleEvent::CancelRequested("shutdown".into()));
        assert_eq!(lc.state(), JobState::Cancelled);
        assert!(terminal_kind(&step).is_some_and(CompletionKind::is_cancelled));
    }

    #[test]
    fn terminal_state_is_never_left() {
        let mut lc = Lifecycle::new(BodyKind::Scoped);
        lc.step(LifecycleEvent::BodyCompleted);
        assert_eq!(lc.state(), JobState::Completed);

        let step = lc.step(LifecycleEvent::CancelRequested("too late".into()));
        assert!(step.actions.is_empty());
        assert_eq!(lc.state(), JobState::Completed);
    }
}
