// src/exec/backend.rs

//! Pluggable execution-substrate abstraction.
//!
//! The job tree never spawns onto a runtime directly; it talks to an
//! `ExecutorBackend` exposing exactly the two primitives the core needs:
//! submit a unit of work, and resume after a duration. This keeps the tree
//! substrate-agnostic and makes it easy to substitute instrumented
//! executors in tests while production code uses [`TokioExecutor`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A scheduled unit of work. Job bodies are driven to completion inside
/// one of these; suspension inside the body releases the worker.
pub type BoxedWork = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A suspension that resolves once the requested duration has elapsed.
pub type BoxedDelay = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Trait abstracting the physical execution substrate.
pub trait ExecutorBackend: Send + Sync + 'static {
    /// Submit a unit of work for execution. The implementation must drive
    /// it to completion; it is free to run it on any worker.
    fn submit(&self, work: BoxedWork);

    /// A future that completes after `duration` has elapsed. Must not
    /// block a worker thread.
    fn delay(&self, duration: Duration) -> BoxedDelay;
}

/// Production backend: `tokio::spawn` + `tokio::time::sleep`.
///
/// Under a paused-clock test runtime (`start_paused = true`) the sleep is
/// driven by virtual time, which the deterministic scenario tests rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioExecutor;

impl ExecutorBackend for TokioExecutor {
    fn submit(&self, work: BoxedWork) {
        tokio::spawn(work);
    }

    fn delay(&self, duration: Duration) -> BoxedDelay {
        Box::pin(tokio::time::sleep(duration))
    }
}
