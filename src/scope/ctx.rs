// src/scope/ctx.rs

//! Job context: the explicit handle a body receives to interact with its
//! own node and launch children.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{JobResult, Result};
use crate::handle::{Deferred, JobHandle};
use crate::scope::{self, Env};
use crate::tree::node::JobNode;
use crate::types::{JobId, SupervisionMode};

/// Context passed to every job body.
///
/// Cancellation is cooperative: it is observed only at the suspension
/// points this context provides ([`JobCtx::delay`], joining or awaiting
/// another job) or at explicit [`JobCtx::checkpoint`] calls. A body that
/// neither suspends nor checks can never be cancelled; that is the
/// caller's responsibility, not a runtime guarantee.
#[derive(Clone)]
pub struct JobCtx {
    node: Arc<JobNode>,
    env: Arc<Env>,
}

impl JobCtx {
    pub(crate) fn new(node: Arc<JobNode>, env: Arc<Env>) -> Self {
        Self { node, env }
    }

    pub fn job_id(&self) -> JobId {
        self.node.id()
    }

    /// `true` while the job is running normally (loop guards:
    /// `while ctx.is_active() { ... }`).
    pub fn is_active(&self) -> bool {
        self.node.is_active()
    }

    /// Explicit cancellation check: returns the cancellation signal if a
    /// request is pending, so `ctx.checkpoint()?` unwinds the body.
    pub fn checkpoint(&self) -> JobResult<()> {
        if self.node.cancel_requested() {
            Err(self.node.cancellation_error())
        } else {
            Ok(())
        }
    }

    /// Suspend for `duration` without blocking the worker.
    ///
    /// This is a suspension point: if cancellation is requested before or
    /// during the delay, the delay is abandoned and the cancellation
    /// signal is raised instead.
    pub async fn delay(&self, duration: Duration) -> JobResult<()> {
        self.checkpoint()?;
        let mut cancelled = self.node.subscribe_cancel();
        let sleep = self.env.executor.delay(duration);
        tokio::select! {
            () = sleep => Ok(()),
            _ = cancelled.wait_for(|flagged| *flagged) => {
                Err(self.node.cancellation_error())
            }
        }
    }

    /// Launch a fire-and-forget child of this job.
    pub fn launch<F, Fut>(&self, body: F) -> Result<JobHandle>
    where
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        scope::launch_on(&self.node, &self.env, None, body)
    }

    /// Launch a child with an explicit supervision mode (how *it* treats
    /// failures of its own children).
    pub fn launch_with_mode<F, Fut>(&self, mode: SupervisionMode, body: F) -> Result<JobHandle>
    where
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        scope::launch_on(&self.node, &self.env, Some(mode), body)
    }

    /// Launch a value-bearing child of this job.
    pub fn launch_deferred<T, F, Fut>(&self, body: F) -> Result<Deferred<T>>
    where
        T: Send + 'static,
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<T>> + Send + 'static,
    {
        scope::launch_deferred_on(&self.node, &self.env, None, body)
    }

    /// Launch a value-bearing child with an explicit supervision mode.
    pub fn launch_deferred_with_mode<T, F, Fut>(
        &self,
        mode: SupervisionMode,
        body: F,
    ) -> Result<Deferred<T>>
    where
        T: Send + 'static,
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<T>> + Send + 'static,
    {
        scope::launch_deferred_on(&self.node, &self.env, Some(mode), body)
    }

    /// Run `f` in a fresh Isolating-rooted subscope of this job; returns
    /// once `f` and all jobs it launched directly are terminal.
    pub async fn supervisor_scope<R, F, Fut>(&self, f: F) -> JobResult<R>
    where
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<R>>,
    {
        scope::supervisor_scope_on(&self.node, &self.env, f).await
    }

    /// Handle to this job itself (e.g. to register completion listeners
    /// from inside the body).
    pub fn handle(&self) -> JobHandle {
        JobHandle::new(Arc::clone(&self.node))
    }
}
