// src/tree/mod.rs

//! The job tree: one node per job, single-parent ownership, per-node locks.
//!
//! - [`lifecycle`]: the pure, synchronous state machine (no Tokio, no locks).
//! - [`node`]: the concurrent shell executing the machine's actions.
//! - [`propagate`]: the bottom-up failure propagator / supervisor.

pub mod lifecycle;
pub mod node;
pub(crate) mod propagate;

pub use lifecycle::{BodyKind, Lifecycle, LifecycleAction, LifecycleEvent, LifecycleStep};
pub use node::{CompletionListener, FailureHandler, JobNode};
