// tests/runtime_shell.rs

mod common;

use std::sync::atomic::Ordering;

use coplan::control::Runtime;
use coplan::errors::CoplanError;
use coplan::job::ScheduleExport;
use coplan::types::TaskStatus;
use coplan_test_utils::oracles::ScriptedAcceptance;
use coplan_test_utils::{init_tracing, with_timeout};

use common::{control_for, parallel_job};

#[tokio::test]
async fn runtime_writes_artifact_to_output_path() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");

    let (job, durations) = parallel_job();
    let control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();
    let runtime = Runtime::new(control, Some(path.clone()));

    let artifact = with_timeout(runtime.run()).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<ScheduleExport> = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(&parsed[0], artifact.initial());
    assert_eq!(&parsed[1], artifact.last());
    assert!(parsed[1].status.iter().all(|s| *s == TaskStatus::Completed));
}

#[tokio::test]
async fn runtime_without_output_only_returns_artifact() {
    let (job, durations) = parallel_job();
    let control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();

    let artifact = with_timeout(Runtime::new(control, None).run()).await.unwrap();
    assert_eq!(artifact.last().rows()[0].end, Some(5));
}

#[tokio::test]
async fn raised_shutdown_flag_interrupts_the_run() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");

    let (job, durations) = parallel_job();
    let control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();
    let runtime = Runtime::new(control, Some(path.clone()));
    runtime.shutdown_handle().store(true, Ordering::SeqCst);

    let result = with_timeout(runtime.run()).await;

    assert!(matches!(result, Err(CoplanError::Interrupted)));
    assert!(!path.exists());
}
