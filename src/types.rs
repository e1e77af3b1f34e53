// src/types.rs

//! Core shared types for the job tree.
//!
//! Everything here is small and cheaply cloneable; causes are shared via
//! `Arc` because a single failure can be observed by several parties (the
//! tree propagator, completion listeners, multiple awaiters).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

/// Stable opaque identity of a job node, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    /// Allocate the next identity.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        JobId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Lifecycle state of a job node.
///
/// `Cancelled`, `Completed` and `Failed` are terminal; a node enters at
/// most one terminal state and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Body is running (or about to run) and no cancellation is pending.
    Active,
    /// Body finished normally; waiting for children to reach terminal states.
    Completing,
    /// Cancellation requested; waiting for the body to unwind and children
    /// to reach terminal states.
    Cancelling,
    /// Terminal: cancelled cooperatively.
    Cancelled,
    /// Terminal: body and all children finished normally.
    Completed,
    /// Terminal: body (or a propagated child failure) failed.
    Failed,
}

impl JobState {
    /// Whether this state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Cancelled | JobState::Completed | JobState::Failed
        )
    }
}

/// Policy governing how a node treats failures of its *children*.
///
/// - `Propagating`: a child failure cancels this node (and continues
///   upward), taking siblings down with it.
/// - `Isolating`: a child failure is absorbed here; siblings keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisionMode {
    #[default]
    Propagating,
    Isolating,
}

impl FromStr for SupervisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "propagating" => Ok(SupervisionMode::Propagating),
            "isolating" => Ok(SupervisionMode::Isolating),
            other => Err(format!(
                "invalid supervision mode: {other} (expected \"propagating\" or \"isolating\")"
            )),
        }
    }
}

/// Human-readable reason attached to a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason(Arc<str>);

impl CancelReason {
    pub fn new(reason: impl Into<String>) -> Self {
        CancelReason(Arc::from(reason.into().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CancelReason {
    fn default() -> Self {
        CancelReason(Arc::from("cancelled"))
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CancelReason {
    fn from(s: &str) -> Self {
        CancelReason::new(s)
    }
}

impl From<String> for CancelReason {
    fn from(s: String) -> Self {
        CancelReason::new(s)
    }
}

/// Captured failure of a job body, set at most once per node and shared
/// between every observer of that node.
#[derive(Clone)]
pub struct FailureCause(Arc<anyhow::Error>);

impl FailureCause {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        FailureCause(Arc::new(err.into()))
    }

    /// Construct from a bare message (mostly useful in tests and examples).
    pub fn msg(message: impl fmt::Display) -> Self {
        FailureCause(Arc::new(anyhow::anyhow!("{message}")))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Terminal outcome of a node, as delivered to completion listeners,
/// `join`/`await_result` callers, and the failure propagator.
#[derive(Debug, Clone)]
pub enum CompletionKind {
    /// The node completed normally.
    Completed,
    /// The node was cancelled cooperatively.
    Cancelled(CancelReason),
    /// The node failed with the captured cause.
    Failed(FailureCause),
}

impl CompletionKind {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionKind::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CompletionKind::Cancelled(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CompletionKind::Failed(_))
    }
}
