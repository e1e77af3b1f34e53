#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobtree::{JobCtx, JobResult, Scope, ScopeBuilder, SupervisionMode};

/// Collects failure causes delivered to a scope's exception handler, so
/// tests can assert on unobserved-failure reporting.
#[derive(Clone, Default)]
pub struct FailureCollector {
    causes: Arc<Mutex<Vec<String>>>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire this collector into a scope builder as its exception handler.
    pub fn install(&self, builder: ScopeBuilder) -> ScopeBuilder {
        let causes = Arc::clone(&self.causes);
        builder.exception_handler(move |cause| {
            causes
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(cause.to_string());
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.causes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A scope whose root uses `mode` and reports unobserved failures into the
/// returned collector.
pub fn collecting_scope(mode: SupervisionMode) -> (Scope, FailureCollector) {
    let collector = FailureCollector::new();
    let scope = collector
        .install(Scope::builder().supervision(mode))
        .build();
    (scope, collector)
}

/// Body that loops forever with a periodic delay; unwinds only via the
/// cancellation signal raised at the delay suspension point.
pub async fn ticking_forever(ctx: JobCtx, period: Duration) -> JobResult<()> {
    loop {
        ctx.delay(period).await?;
    }
}

/// Body that loops while the job is active, checking between delays.
pub async fn ticking_while_active(ctx: JobCtx, period: Duration) -> JobResult<()> {
    while ctx.is_active() {
        ctx.delay(period).await?;
    }
    Ok(())
}
