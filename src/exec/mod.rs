// src/exec/mod.rs

//! Execution backends.

pub mod backend;

pub use backend::{BoxedDelay, BoxedWork, ExecutorBackend, TokioExecutor};
