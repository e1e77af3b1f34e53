// tests/deferred_await.rs

//! The await/join contract for value-bearing jobs.

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use jobtree::{JobError, JobState, Scope};
use tokio::time::Instant;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn await_returns_the_produced_value() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let deferred = scope.launch_deferred(|ctx| async move {
        ctx.delay(Duration::from_millis(10)).await?;
        Ok(41 + 1)
    })?;

    assert_eq!(deferred.await_result().await?, 42);
    assert_eq!(deferred.state(), JobState::Completed);
    Ok(())
}

/// Two independent deferreds each delaying one time unit, awaited
/// sequentially, overlap: total elapsed time is one unit, not two.
#[tokio::test(start_paused = true)]
async fn independent_deferreds_run_concurrently() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let started = Instant::now();

    let first = scope.launch_deferred(|ctx| async move {
        ctx.delay(Duration::from_secs(1)).await?;
        Ok(5)
    })?;
    let second = scope.launch_deferred(|ctx| async move {
        ctx.delay(Duration::from_secs(1)).await?;
        Ok(6)
    })?;

    let sum = first.await_result().await? + second.await_result().await?;
    let elapsed = started.elapsed();

    assert_eq!(sum, 11);
    assert!(
        elapsed < Duration::from_millis(1500),
        "delays must overlap, took {elapsed:?}"
    );
    Ok(())
}

/// Awaiting a failed deferred re-raises the captured cause, to every
/// caller, once per call.
#[tokio::test(start_paused = true)]
async fn await_on_failed_deferred_reraises_cause() -> TestResult {
    init_tracing();

    let scope = Scope::builder()
        .supervision(jobtree::SupervisionMode::Isolating)
        .build();
    let deferred = scope.launch_deferred(|_ctx| async move {
        Err(anyhow::anyhow!("can't do"))?;
        Ok(0u8)
    })?;

    let first_call = deferred.await_result().await.expect_err("must fail");
    let second_call = deferred.await_result().await.expect_err("must fail again");
    for err in [first_call, second_call] {
        match err {
            JobError::Failed(cause) => assert!(cause.to_string().contains("can't do")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
    Ok(())
}

/// Awaiting a cancelled deferred raises the cancellation signal, not a
/// failure.
#[tokio::test(start_paused = true)]
async fn await_on_cancelled_deferred_raises_cancellation() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let deferred = scope.launch_deferred(|ctx| async move {
        ctx.delay(Duration::from_secs(60)).await?;
        Ok("never".to_string())
    })?;

    deferred.cancel_with_reason("changed my mind");
    match deferred.await_result().await {
        Err(JobError::Cancelled(reason)) => assert_eq!(reason.as_str(), "changed my mind"),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(deferred.state(), JobState::Cancelled);
    Ok(())
}

/// `join` never raises; failure stays visible through explicit state
/// inspection instead.
#[tokio::test(start_paused = true)]
async fn join_swallows_failure_but_keeps_it_inspectable() -> TestResult {
    init_tracing();

    let scope = Scope::builder()
        .supervision(jobtree::SupervisionMode::Isolating)
        .build();
    let deferred = scope.launch_deferred(|_ctx| async move {
        Err(anyhow::anyhow!("quiet failure"))?;
        Ok(0u8)
    })?;

    deferred.join().await;

    assert_eq!(deferred.state(), JobState::Failed);
    assert!(!deferred.is_cancelled());
    let cause = deferred.failure_cause().expect("cause visible after join");
    assert!(cause.to_string().contains("quiet failure"));
    Ok(())
}

/// A bounded wait is built by racing a delay job against the awaited job
/// and cancelling whichever loses.
#[tokio::test(start_paused = true)]
async fn timeout_built_from_racing_a_delay() -> TestResult {
    init_tracing();

    let scope = Scope::new();
    let slow = scope.launch_deferred(|ctx| async move {
        ctx.delay(Duration::from_secs(60)).await?;
        Ok("slow".to_string())
    })?;
    let timer = scope.launch(|ctx| async move {
        ctx.delay(Duration::from_millis(100)).await?;
        Ok(())
    })?;

    tokio::select! {
        result = slow.await_result() => panic!("slow job should not win: {result:?}"),
        () = timer.join() => slow.cancel_with_reason("timed out"),
    }

    match slow.await_result().await {
        Err(JobError::Cancelled(reason)) => assert_eq!(reason.as_str(), "timed out"),
        other => panic!("expected cancellation, got {other:?}"),
    }
    Ok(())
}
