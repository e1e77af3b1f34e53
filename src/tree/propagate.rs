// src/tree/propagate.rs

//! Failure propagator / supervisor.
//!
//! The cancellation propagator is [`JobNode::request_cancel`] (top-down,
//! subtree only). This module holds the complementary bottom-up walk that
//! runs when a body raises a real failure:
//!
//! - Each `Propagating` ancestor is cancelled with the failure as cause
//!   (siblings of the failing node die as a side effect of their parent's
//!   own cancellation, never directly).
//! - The walk stops at the first `Isolating` ancestor, which absorbs the
//!   failure, or past the root.
//! - Wherever the walk ends, the failure is reported exactly once if no
//!   awaiter will observe it: through the nearest registered exception
//!   handler, else the process-wide `tracing::error!` fallback.

use std::sync::Arc;

use tracing::debug;

use crate::tree::node::JobNode;
use crate::types::{FailureCause, SupervisionMode};

/// Walk upward from `failing` (whose own subtree is already being
/// cancelled by its lifecycle) applying the supervision policy of each
/// ancestor in turn.
pub(crate) fn propagate_failure(failing: &Arc<JobNode>, cause: FailureCause) {
    let observed = failing.has_direct_observer();
    let mut current = failing.parent();

    loop {
        match current {
            None => {
                // Root reached (or the failing node was itself a root):
                // nothing above can absorb the failure.
                if !observed {
                    failing.report_failure(&cause);
                }
                return;
            }
            Some(ancestor) => {
                if ancestor.mode() == SupervisionMode::Isolating {
                    debug!(
                        job = %ancestor.id(),
                        failed = %failing.id(),
                        %cause,
                        "isolating supervisor absorbed child failure"
                    );
                    if !observed {
                        ancestor.report_failure(&cause);
                    }
                    return;
                }

                debug!(
                    job = %ancestor.id(),
                    failed = %failing.id(),
                    "propagating child failure: cancelling ancestor"
                );
                ancestor.fail_cancel(cause.clone());
                current = ancestor.parent();
            }
        }
    }
}
