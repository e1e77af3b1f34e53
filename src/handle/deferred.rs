// src/handle/deferred.rs

//! Value-bearing job handle.

use std::ops::Deref;
use std::sync::{Arc, Mutex};

use crate::errors::{JobError, JobResult};
use crate::handle::job::JobHandle;
use crate::types::{CompletionKind, FailureCause};

/// A job whose body produces a value, observable via
/// [`Deferred::await_result`].
///
/// All the plain [`JobHandle`] operations are available through `Deref`.
/// The handle may be awaited any number of times from any number of
/// callers; each call observes the same terminal outcome, which is why the
/// value type must be `Clone`.
pub struct Deferred<T> {
    handle: JobHandle,
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").field("handle", &self.handle).finish()
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Deref for Deferred<T> {
    type Target = JobHandle;

    fn deref(&self) -> &JobHandle {
        &self.handle
    }
}

impl<T> Deferred<T> {
    pub(crate) fn new(handle: JobHandle, slot: Arc<Mutex<Option<T>>>) -> Self {
        Self { handle, slot }
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }
}

impl<T: Clone> Deferred<T> {
    /// Suspend until the job is terminal, then deliver its outcome:
    ///
    /// - `Ok(value)` if it completed normally
    /// - `Err(JobError::Failed(cause))` re-raising the captured failure
    ///   (the direct propagation path; the caller need not be the parent)
    /// - `Err(JobError::Cancelled(reason))` if it was cancelled
    pub async fn await_result(&self) -> JobResult<T> {
        match self.handle.join_outcome().await {
            CompletionKind::Completed => {
                let slot = self
                    .slot
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                match slot.as_ref() {
                    Some(value) => Ok(value.clone()),
                    // Completed implies the body stored its value first;
                    // surface a failure rather than panicking if that
                    // invariant is ever broken.
                    None => Err(JobError::Failed(FailureCause::msg(
                        "completed deferred has empty result slot",
                    ))),
                }
            }
            CompletionKind::Cancelled(reason) => Err(JobError::Cancelled(reason)),
            CompletionKind::Failed(cause) => Err(JobError::Failed(cause)),
        }
    }
}
