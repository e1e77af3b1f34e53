// src/errors.rs

//! Crate-wide error types and aliases.
//!
//! There are two deliberately separate error surfaces:
//!
//! - [`Error`] is returned by the crate API itself (config loading,
//!   launching on a closed scope, ...).
//! - [`JobError`] is the control-flow signal flowing *through job bodies*:
//!   either a cooperative cancellation or a real failure. Keeping the two
//!   arms structurally distinct is what lets the failure propagator tell
//!   "stop cooperatively" apart from "something broke" without downcasts.

use thiserror::Error;

use crate::types::{CancelReason, FailureCause, JobId};

/// Errors returned by the crate API.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A job can only be created under a parent that is not already
    /// cancelling or terminal.
    #[error("scope closed: {job} is no longer accepting children (state {state:?})")]
    ScopeClosed {
        job: JobId,
        state: crate::types::JobState,
    },

    #[error("job tree depth limit ({0}) exceeded")]
    DepthLimit(usize),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome signal raised out of a job body.
///
/// `Cancelled` is *not* a failure: `join` swallows it and the failure
/// propagator ignores it. `Failed` is captured into the node's
/// `failure_cause` and drives supervision.
#[derive(Error, Debug, Clone)]
pub enum JobError {
    #[error("job cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("job failed: {0}")]
    Failed(FailureCause),
}

impl JobError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, JobError::Cancelled(_))
    }

    /// Failure cause, if this is a real failure.
    pub fn failure_cause(&self) -> Option<&FailureCause> {
        match self {
            JobError::Cancelled(_) => None,
            JobError::Failed(cause) => Some(cause),
        }
    }
}

// Lets bodies use `?` on arbitrary errors; anything that is not an explicit
// cancellation signal counts as a real failure.
impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        JobError::Failed(FailureCause::new(err))
    }
}

// A crate API error escaping a body (e.g. launching on a closed scope)
// counts as a real failure of that body.
impl From<Error> for JobError {
    fn from(err: Error) -> Self {
        JobError::Failed(FailureCause::new(err))
    }
}

impl From<FailureCause> for JobError {
    fn from(cause: FailureCause) -> Self {
        JobError::Failed(cause)
    }
}

impl From<CancelReason> for JobError {
    fn from(reason: CancelReason) -> Self {
        JobError::Cancelled(reason)
    }
}

/// Result alias for job bodies: `Ok` carries the produced value,
/// `Err` carries the cancellation/failure signal.
pub type JobResult<T> = std::result::Result<T, JobError>;
