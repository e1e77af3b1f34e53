// src/lib.rs

//! # jobtree
//!
//! A structured-concurrency job tree: lightweight asynchronous jobs
//! organized into a tree mirroring the call structure that spawned them,
//! with two enforced invariants:
//!
//! - **No job outlives its parent.** A parent cannot reach a terminal
//!   state while any child is outstanding (join-all-children barrier).
//! - **Failures propagate along well-defined paths** unless explicitly
//!   isolated: a child failure cancels Propagating ancestors (and thereby
//!   its siblings) up to the first Isolating supervisor, which absorbs it.
//!
//! Cancellation is cooperative: request-then-observe, never forcible.
//! Bodies observe requests at suspension points ([`JobCtx::delay`],
//! joining or awaiting other jobs) or explicit [`JobCtx::checkpoint`]
//! calls, and unwind by returning the [`JobError::Cancelled`] signal.
//!
//! The execution substrate is external: the tree only needs "submit a
//! unit of work" and "resume after a duration", expressed by
//! [`ExecutorBackend`] and provided in production by [`TokioExecutor`].
//!
//! ```no_run
//! use std::time::Duration;
//! use jobtree::{Scope, JobResult};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let scope = Scope::new();
//!
//! let sum = scope.launch_deferred(|ctx| async move {
//!     ctx.delay(Duration::from_millis(10)).await?;
//!     JobResult::Ok(2 + 3)
//! })?;
//!
//! let worker = scope.launch(|ctx| async move {
//!     while ctx.is_active() {
//!         ctx.delay(Duration::from_millis(50)).await?;
//!     }
//!     Ok(())
//! })?;
//!
//! assert_eq!(sum.await_result().await.ok(), Some(5));
//! worker.cancel_and_join().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod exec;
pub mod handle;
pub mod logging;
pub mod scope;
pub mod tree;
pub mod types;

pub use config::{RuntimeConfig, load_and_validate};
pub use errors::{Error, JobError, JobResult, Result};
pub use exec::{ExecutorBackend, TokioExecutor};
pub use handle::{Deferred, JobHandle};
pub use scope::{JobCtx, Scope, ScopeBuilder};
pub use types::{
    CancelReason, CompletionKind, FailureCause, JobId, JobState, SupervisionMode,
};
