// tests/config_and_backend.rs

//! File-driven configuration and the executor backend seam.

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use jobtree::{Error as JobtreeError, JobState, Scope, SupervisionMode, load_and_validate};
use jobtree_test_utils::RecordingExecutor;

type TestResult = Result<(), Box<dyn Error>>;

fn write_temp_config(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("jobtree-{name}-{}.toml", std::process::id()));
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn loads_and_validates_a_full_config() -> TestResult {
    let path = write_temp_config(
        "full",
        r#"
[runtime]
default_supervision = "isolating"
max_tree_depth = 8

[logging]
level = "debug"
"#,
    );

    let config = load_and_validate(&path)?;
    assert_eq!(config.default_supervision(), SupervisionMode::Isolating);
    assert_eq!(config.max_tree_depth(), Some(8));
    assert_eq!(config.log_level(), Some(tracing::Level::DEBUG));

    fs::remove_file(path).ok();
    Ok(())
}

#[test]
fn unknown_keys_are_a_parse_error() {
    let path = write_temp_config("unknown-key", "[runtime]\nmax_depth = 4\n");
    assert!(matches!(
        load_and_validate(&path),
        Err(JobtreeError::Toml(_))
    ));
    fs::remove_file(path).ok();
}

#[tokio::test(start_paused = true)]
async fn depth_limit_rejects_launches_past_the_bound() -> TestResult {
    init_tracing();

    // Depth 1 allows children of the root but nothing below them.
    let scope = Scope::builder().max_tree_depth(1).build();

    let parent = scope.launch(|ctx| async move {
        let err = ctx
            .launch(|_c| async move { Ok(()) })
            .expect_err("grandchild launch should hit the depth limit");
        assert!(matches!(err, JobtreeError::DepthLimit(1)));
        Ok(())
    })?;

    parent.join().await;
    assert_eq!(parent.state(), JobState::Completed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn config_drives_scope_construction() -> TestResult {
    init_tracing();

    let path = write_temp_config(
        "scope",
        "[runtime]\ndefault_supervision = \"isolating\"\nmax_tree_depth = 2\n",
    );
    let config = load_and_validate(&path)?;
    fs::remove_file(path).ok();

    let scope = Scope::from_config(&config);

    // Isolating root: a direct child's failure is absorbed at the root.
    let failing = scope.launch(|_ctx| async move {
        Err(anyhow::anyhow!("contained"))?;
        Ok(())
    })?;
    failing.join().await;
    assert_eq!(failing.state(), JobState::Failed);
    assert_eq!(scope.root_handle().state(), JobState::Active);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn all_work_and_delays_flow_through_the_backend() -> TestResult {
    init_tracing();

    let recorder = Arc::new(RecordingExecutor::new());
    let scope = Scope::builder()
        .executor(Arc::clone(&recorder) as Arc<dyn jobtree::ExecutorBackend>)
        .build();

    let outer = scope.launch(|ctx| async move {
        ctx.delay(Duration::from_millis(250)).await?;
        ctx.launch(|c| async move {
            c.delay(Duration::from_millis(750)).await?;
            Ok(())
        })?;
        Ok(())
    })?;
    outer.join().await;

    assert_eq!(recorder.submitted(), 2);
    assert_eq!(
        recorder.delays(),
        vec![Duration::from_millis(250), Duration::from_millis(750)]
    );
    Ok(())
}
