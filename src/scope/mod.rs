// src/scope/mod.rs

//! Scopes and job contexts: the only ways to launch jobs.
//!
//! There is no ambient "current job": launching requires either a
//! [`Scope`] (from outside the tree) or a [`JobCtx`] (inside a body),
//! both of which carry the parent node and the execution environment
//! explicitly.

pub mod ctx;
pub mod scope;

pub use ctx::JobCtx;
pub use scope::{Scope, ScopeBuilder};

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::errors::{JobError, JobResult, Result};
use crate::exec::ExecutorBackend;
use crate::handle::{Deferred, JobHandle};
use crate::tree::lifecycle::BodyKind;
use crate::tree::node::JobNode;
use crate::types::{CompletionKind, FailureCause, SupervisionMode};

/// Execution environment shared by a scope and every context under it.
pub(crate) struct Env {
    pub(crate) executor: Arc<dyn ExecutorBackend>,
    pub(crate) max_depth: Option<usize>,
}

/// Attach a fire-and-forget job under `parent` and submit its body.
pub(crate) fn launch_on<F, Fut>(
    parent: &Arc<JobNode>,
    env: &Arc<Env>,
    mode: Option<SupervisionMode>,
    body: F,
) -> Result<JobHandle>
where
    F: FnOnce(JobCtx) -> Fut,
    Fut: Future<Output = JobResult<()>> + Send + 'static,
{
    let child = parent.spawn_child(mode, false, BodyKind::Scoped, env.max_depth)?;
    let ctx = JobCtx::new(Arc::clone(&child), Arc::clone(env));
    let fut = body(ctx);

    let node = Arc::clone(&child);
    env.executor.submit(Box::pin(async move {
        let result = fut.await;
        node.body_finished(result);
    }));

    Ok(JobHandle::new(child))
}

/// Attach a value-bearing job under `parent` and submit its body. The
/// produced value lands in the deferred's slot before the node's terminal
/// transition, so `Completed` always implies a populated slot.
pub(crate) fn launch_deferred_on<T, F, Fut>(
    parent: &Arc<JobNode>,
    env: &Arc<Env>,
    mode: Option<SupervisionMode>,
    body: F,
) -> Result<Deferred<T>>
where
    T: Send + 'static,
    F: FnOnce(JobCtx) -> Fut,
    Fut: Future<Output = JobResult<T>> + Send + 'static,
{
    let child = parent.spawn_child(mode, true, BodyKind::Scoped, env.max_depth)?;
    let slot: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
    let ctx = JobCtx::new(Arc::clone(&child), Arc::clone(env));
    let fut = body(ctx);

    let node = Arc::clone(&child);
    let result_slot = Arc::clone(&slot);
    env.executor.submit(Box::pin(async move {
        let result = fut.await;
        let unit = result.map(|value| {
            *result_slot
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(value);
        });
        node.body_finished(unit);
    }));

    Ok(Deferred::new(JobHandle::new(child), slot))
}

/// Run `f` under a fresh Isolating-rooted subscope of `parent`.
///
/// `f` runs inline (not submitted); the call returns once `f` and every
/// job it launched directly are terminal. A failure returned by `f` is
/// delivered to the caller instead of the tree propagator; the caller
/// observes it directly, exactly like a deferred's awaiter would.
pub(crate) async fn supervisor_scope_on<R, F, Fut>(
    parent: &Arc<JobNode>,
    env: &Arc<Env>,
    f: F,
) -> JobResult<R>
where
    F: FnOnce(JobCtx) -> Fut,
    Fut: Future<Output = JobResult<R>>,
{
    let node = parent
        .spawn_child(
            Some(SupervisionMode::Isolating),
            true,
            BodyKind::Scoped,
            env.max_depth,
        )
        .map_err(|err| JobError::Failed(FailureCause::new(err)))?;

    let ctx = JobCtx::new(Arc::clone(&node), Arc::clone(env));
    let result = f(ctx).await;

    node.body_finished_observed(match &result {
        Ok(_) => Ok(()),
        Err(err) => Err(err.clone()),
    });

    // Join-all-children barrier: wait for directly-launched jobs to drain.
    let outcome = node.wait_terminal().await;
    match outcome {
        // The subscope was cancelled from outside while the body was
        // succeeding; surface the cancellation to the caller.
        CompletionKind::Cancelled(reason) if result.is_ok() => Err(JobError::Cancelled(reason)),
        _ => result,
    }
}
