// src/handle/mod.rs

//! Public job handles.

pub mod deferred;
pub mod job;

pub use deferred::Deferred;
pub use job::JobHandle;
