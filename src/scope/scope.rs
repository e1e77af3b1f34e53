// src/scope/scope.rs

//! Root scopes: entry points into the job tree from outside it.

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::config::RuntimeConfig;
use crate::errors::{JobResult, Result};
use crate::exec::{ExecutorBackend, TokioExecutor};
use crate::handle::{Deferred, JobHandle};
use crate::scope::{self, Env, JobCtx};
use crate::tree::node::{FailureHandler, JobNode};
use crate::types::{CancelReason, FailureCause, SupervisionMode};

/// A root scope: the attach point for jobs launched from outside the tree.
///
/// The scope's root is a container node: it never completes on its own;
/// it stays open for new jobs until [`Scope::cancel`] (or
/// [`Scope::shutdown`]) takes the whole tree down.
#[derive(Clone)]
pub struct Scope {
    root: Arc<JobNode>,
    env: Arc<Env>,
}

impl Scope {
    /// A scope with default settings: Propagating supervision, no
    /// exception handler, Tokio execution.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ScopeBuilder {
        ScopeBuilder::default()
    }

    /// A scope configured from a validated [`RuntimeConfig`].
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Launch a fire-and-forget job as a child of the scope root.
    pub fn launch<F, Fut>(&self, body: F) -> Result<JobHandle>
    where
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        scope::launch_on(&self.root, &self.env, None, body)
    }

    /// Launch with an explicit supervision mode for the new job.
    pub fn launch_with_mode<F, Fut>(&self, mode: SupervisionMode, body: F) -> Result<JobHandle>
    where
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        scope::launch_on(&self.root, &self.env, Some(mode), body)
    }

    /// Launch a value-bearing job as a child of the scope root.
    pub fn launch_deferred<T, F, Fut>(&self, body: F) -> Result<Deferred<T>>
    where
        T: Send + 'static,
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<T>> + Send + 'static,
    {
        scope::launch_deferred_on(&self.root, &self.env, None, body)
    }

    /// Launch a value-bearing job with an explicit supervision mode.
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
        scope::launch_deferred_on(&self.root, &self.env, Some(mode), body)
    }

    /// Run `f` in a fresh Isolating-rooted subscope; see
    /// [`JobCtx::supervisor_scope`] for the in-body variant.
    pub async fn supervisor_scope<R, F, Fut>(&self, f: F) -> JobResult<R>
    where
        F: FnOnce(JobCtx) -> Fut,
        Fut: Future<Output = JobResult<R>>,
    {
        scope::supervisor_scope_on(&self.root, &self.env, f).await
    }

    /// Handle to the scope's root job (join the whole tree, register a
    /// completion listener on it, ...).
    pub fn root_handle(&self) -> JobHandle {
        JobHandle::new(Arc::clone(&self.root))
    }

    /// Cancel every job in the scope, cooperatively.
    pub fn cancel(&self, reason: impl Into<CancelReason>) {
        self.root.request_cancel(reason.into());
    }

    /// Cancel everything and wait for the tree to finish unwinding.
    pub async fn shutdown(&self) {
        info!(root = %self.root.id(), "scope shutdown requested");
        self.cancel("scope shutdown");
        let _ = self.root.wait_terminal().await;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("root", &self.root).finish()
    }
}

/// Builder for [`Scope`].
pub struct ScopeBuilder {
    mode: SupervisionMode,
    handler: Option<Arc<FailureHandler>>,
    executor: Arc<dyn ExecutorBackend>,
    max_depth: Option<usize>,
}

impl Default for ScopeBuilder {
    fn default() -> Self {
        Self {
            mode: SupervisionMode::Propagating,
            handler: None,
            executor: Arc::new(TokioExecutor),
            max_depth: None,
        }
    }
}

impl ScopeBuilder {
    /// Supervision mode of the scope root (how it treats failures of the
    /// jobs launched directly on the scope).
    pub fn supervision(mut self, mode: SupervisionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Install the handler invoked for failures no awaiter will observe.
    /// Inherited by every job and subscope created under this scope.
    pub fn exception_handler(
        mut self,
        handler: impl Fn(&FailureCause) + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Substitute the execution substrate (tests, instrumented executors).
    pub fn executor(mut self, executor: Arc<dyn ExecutorBackend>) -> Self {
        self.executor = executor;
        self
    }

    /// Guard against runaway recursion: launching deeper than this fails.
    pub fn max_tree_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Apply the relevant settings from a validated [`RuntimeConfig`].
    pub fn config(mut self, config: &RuntimeConfig) -> Self {
        self.mode = config.default_supervision();
        self.max_depth = config.max_tree_depth();
        self
    }

    pub fn build(self) -> Scope {
        let root = JobNode::new_root(self.mode, self.handler);
        let env = Arc::new(Env {
            executor: self.executor,
            max_depth: self.max_depth,
        });
        Scope { root, env }
    }
}
