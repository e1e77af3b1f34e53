// tests/cancellation_tree.rs

//! Cancellation propagation scenarios: cancelling a node takes down its
//! whole subtree, and nothing else.

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobtree::{CompletionKind, JobHandle, JobState, Scope};
use jobtree_test_utils::builders::{ticking_forever, ticking_while_active};

type TestResult = Result<(), Box<dyn Error>>;

fn push_handle(slot: &Arc<Mutex<Vec<JobHandle>>>, handle: JobHandle) {
    slot.lock().unwrap().push(handle);
}

/// A parent with two periodically-delaying children; cancel
/// the parent before their natural termination. Both children and the
/// parent end Cancelled, and the parent's completion listener observes a
/// cancellation indicator.
#[tokio::test(start_paused = true)]
async fn cancelling_parent_cancels_both_children() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let children: Arc<Mutex<Vec<JobHandle>>> = Arc::new(Mutex::new(Vec::new()));

    let kids = Arc::clone(&children);
    let parent = scope.launch(move |ctx| async move {
        push_handle(
            &kids,
            ctx.launch(|c| ticking_forever(c, Duration::from_millis(10)))?,
        );
        push_handle(
            &kids,
            ctx.launch(|c| ticking_while_active(c, Duration::from_millis(20)))?,
        );
        Ok(())
    })?;

    let observed: Arc<Mutex<Vec<CompletionKind>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&observed);
    parent.invoke_on_completion(move |kind| seen.lock().unwrap().push(kind));

    // Let the children tick a few times before pulling the plug.
    tokio::time::sleep(Duration::from_millis(50)).await;
    parent.cancel();
    parent.join().await;

    assert_eq!(parent.state(), JobState::Cancelled);
    let children = children.lock().unwrap();
    assert_eq!(children.len(), 2);
    for child in children.iter() {
        assert_eq!(child.state(), JobState::Cancelled);
    }

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    assert!(observed[0].is_cancelled());
    Ok(())
}

/// Cancelling one child leaves its parent and sibling untouched.
#[tokio::test(start_paused = true)]
async fn cancelling_child_leaves_parent_and_sibling_running() -> TestResult {
    init_tracing();

    let scope = Scope::new();

    let parent = scope.launch(|ctx| async move {
        let first = ctx.launch(|c| ticking_forever(c, Duration::from_millis(10)))?;
        let second = ctx.launch(|c| ticking_while_active(c, Duration::from_millis(20)))?;

        first.cancel_and_join().await;
        assert_eq!(first.state(), JobState::Cancelled);
        // Sibling and self keep going.
        assert!(second.is_active());
        ctx.checkpoint()?;

        ctx.delay(Duration::from_millis(30)).await?;
        assert!(second.is_active());
        second.cancel();
        Ok(())
    })?;

    parent.join().await;
    assert_eq!(parent.state(), JobState::Completed);
    Ok(())
}

/// Cancelling an already-finished job is a no-op: the terminal state is
/// never re-entered or changed.
#[tokio::test(start_paused = true)]
async fn cancel_after_completion_is_a_no_op() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let job = scope.launch(|_ctx| async move { Ok(()) })?;
    job.join().await;
    assert_eq!(job.state(), JobState::Completed);

    job.cancel();
    job.cancel_with_reason("again");
    assert_eq!(job.state(), JobState::Completed);
    assert!(job.outcome().is_some_and(|kind| kind.is_completed()));
    Ok(())
}

/// A body that loops on `is_active` unwinds via the delay suspension point
/// once cancellation is requested.
#[tokio::test(start_paused = true)]
async fn cancellation_is_observed_at_suspension_points() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let ticks = Arc::new(Mutex::new(0u32));

    let counter = Arc::clone(&ticks);
    let job = scope.launch(move |ctx| async move {
        while ctx.is_active() {
            ctx.delay(Duration::from_millis(10)).await?;
            *counter.lock().unwrap() += 1;
        }
        Ok(())
    })?;

    tokio::time::sleep(Duration::from_millis(35)).await;
    job.cancel_and_join().await;

    assert_eq!(job.state(), JobState::Cancelled);
    assert!(job.is_cancelled());
    let ticks = *ticks.lock().unwrap();
    assert!((1..=4).contains(&ticks), "expected a few ticks, got {ticks}");
    Ok(())
}

/// A cancelled scope no longer accepts new jobs.
#[tokio::test(start_paused = true)]
async fn launching_on_a_cancelled_scope_fails() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    scope.shutdown().await;

    let err = scope
        .launch(|_ctx| async move { Ok(()) })
        .expect_err("launch on closed scope must fail");
    assert!(matches!(err, jobtree::Error::ScopeClosed { .. }));
    Ok(())
}

/// The terminal transition must reach joiners that subscribe only after
/// the job has already finished (nobody was watching when it happened).
#[tokio::test(start_paused = true)]
async fn join_returns_when_nobody_watched_the_terminal_transition() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let job = scope.launch(|_ctx| async move { Ok(()) })?;

    // Let the body run to completion without a single subscriber.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(job.state(), JobState::Completed);

    with_timeout(job.join()).await;
    assert!(job.outcome().is_some_and(|kind| kind.is_completed()));
    Ok(())
}

/// Wide fan-out: many cheap jobs, all joined; the tree handles breadth and
/// the scope root stays open throughout.
#[tokio::test(start_paused = true)]
async fn wide_fanout_joins_all_children() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let mut handles = Vec::new();
    for _ in 0..500 {
        handles.push(scope.launch(|ctx| async move {
            ctx.delay(Duration::from_millis(10)).await?;
            Ok(())
        })?);
    }

    with_timeout(async {
        for handle in &handles {
            handle.join().await;
            assert_eq!(handle.state(), JobState::Completed);
        }
    })
    .await;
    assert!(scope.root_handle().is_active());
    Ok(())
}
