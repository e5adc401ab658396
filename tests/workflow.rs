//! End-to-end orchestration against the real filesystem.

use std::path::Path;

use wavefront::completion::{CompletionEvent, CompletionOutcome, CRASH_REASON};
use wavefront::config::{Config, RoleKind};
use wavefront::context::ServiceContext;
use wavefront::error::{Rejection, StoreError};
use wavefront::graph::{Phase, PhaseArtifact, ReviewStatus, Task, TaskStatus};
use wavefront::orchestrator::Orchestrator;
use wavefront::Error;

const IMPL_OUTPUT: &str = "Task ID: {id}\n\
+    #[test]\n\
+    fn rejects_expired_token() {}\n\
test result: ok. 5 passed; 0 failed; 0 ignored\n\
Files modified: src/auth.rs\n";

fn impl_output(id: &str) -> String {
    IMPL_OUTPUT.replace("{id}", id)
}

fn tasks() -> Vec<Task> {
    vec![Task::new("T1", 1), Task::new("T2", 1), Task::new("T3", 2).depending_on(["T1"])]
}

/// Walks the phases up to execute and loads `tasks()` during decompose.
fn start_execute(orch: &Orchestrator<'_>, root: &Path) {
    orch.init("auth", Vec::new(), false).unwrap();
    std::fs::create_dir_all(root.join(".wavefront/specs")).unwrap();
    std::fs::create_dir_all(root.join(".wavefront/plans")).unwrap();
    std::fs::write(root.join(".wavefront/specs/auth.md"), "# Auth\n").unwrap();
    std::fs::write(root.join(".wavefront/plans/auth.md"), "# Plan\n").unwrap();

    orch.skip(Phase::Brainstorm).unwrap();
    orch.advance(Phase::Specify, Some(PhaseArtifact::from(".wavefront/specs/auth.md".to_string())))
        .unwrap();
    orch.skip(Phase::Clarify).unwrap();
    orch.advance(
        Phase::Architecture,
        Some(PhaseArtifact::from(".wavefront/plans/auth.md".to_string())),
    )
    .unwrap();
    orch.advance(Phase::Decompose, None).unwrap();
    orch.load_tasks(tasks()).unwrap();
    orch.advance(Phase::Execute, None).unwrap();
}

fn implement(orch: &Orchestrator<'_>, id: &str) {
    let session = format!("session-{id}");
    orch.admit(id, Some(&session)).unwrap();
    let output = impl_output(id);
    let event = CompletionEvent {
        role: RoleKind::Implementation,
        task_id: None,
        session_id: Some(&session),
        output: &output,
    };
    let outcome = orch.complete(&event).unwrap();
    assert!(matches!(outcome, CompletionOutcome::Recorded(_)), "{outcome:?}");
}

#[test]
fn phase_walk_waves_and_gate() {
    let root = tempfile::tempdir().unwrap();
    let ctx = ServiceContext::live();
    let orch = Orchestrator::new(&ctx, Config::default(), root.path());
    start_execute(&orch, root.path());

    let graph = orch.status().unwrap().unwrap();
    assert_eq!(graph.current_phase, Phase::Execute);
    assert_eq!(graph.current_wave, 1);
    assert_eq!(graph.spec_file.as_deref(), Some(".wavefront/specs/auth.md"));
    assert!(graph.skipped_phases.contains(&Phase::Clarify));

    // Wave 2 is closed until the wave 1 gate passes.
    let err = orch.admit("T3", None).unwrap_err();
    assert!(matches!(err, Error::Rejected(Rejection::FutureWave { .. })), "{err}");
    let err = orch.gate(Some(2)).unwrap_err();
    assert!(matches!(err, Error::Rejected(Rejection::WaveNotStarted { wave: 2, .. })), "{err}");

    implement(&orch, "T1");
    implement(&orch, "T2");
    let report = orch.gate(None).unwrap();
    assert!(!report.passed);
    assert_eq!(report.failed_tasks.unreviewed, ["T1", "T2"]);

    assert_eq!(orch.review("T1", "VERDICT: PASSED").unwrap(), ReviewStatus::Passed);
    assert_eq!(
        orch.review("T2", "ADVISORY: consider a constant for the TTL").unwrap(),
        ReviewStatus::Passed
    );
    orch.spec_check(None, "LOW: naming differs from the glossary").unwrap();

    let report = orch.gate(None).unwrap();
    assert!(report.passed, "{}", report.render());
    assert_eq!(report.next_wave, Some(2));

    let graph = orch.status().unwrap().unwrap();
    assert_eq!(graph.current_wave, 2);
    assert_eq!(graph.task("T1").unwrap().status, TaskStatus::Completed);
    assert!(graph.gate(1).unwrap().passed());
    orch.admit("T3", None).unwrap();
}

#[test]
fn crash_detection_and_retry() {
    let root = tempfile::tempdir().unwrap();
    let ctx = ServiceContext::live();
    let orch = Orchestrator::new(&ctx, Config::default(), root.path());
    start_execute(&orch, root.path());

    orch.admit("T1", None).unwrap();
    orch.admit("T2", None).unwrap();
    let crashed = CompletionEvent {
        role: RoleKind::Implementation,
        task_id: None,
        session_id: None,
        output: "",
    };
    let outcome = orch.complete(&crashed).unwrap();
    assert_eq!(outcome, CompletionOutcome::CrashDetected { failed: vec!["T1".into(), "T2".into()] });

    let graph = orch.status().unwrap().unwrap();
    let task = graph.task("T1").unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_reason.as_deref(), Some(CRASH_REASON));
    assert!(graph.executing_tasks.is_empty());

    let skipped = orch.retry(&["T1", "T3"]).unwrap();
    assert_eq!(skipped, ["T3"]);
    let graph = orch.status().unwrap().unwrap();
    assert_eq!(graph.task("T1").unwrap().status, TaskStatus::Pending);
    assert_eq!(graph.task("T1").unwrap().retry_count, 1);
    assert_eq!(graph.task("T2").unwrap().status, TaskStatus::Failed);
}

#[test]
fn held_lock_exhausts_retries() {
    let root = tempfile::tempdir().unwrap();
    let ctx = ServiceContext::live();
    let mut config = Config::default();
    config.lock.attempts = 3;
    config.lock.retry_interval_ms = 1;
    let orch = Orchestrator::new(&ctx, config, root.path());
    orch.init("auth", vec![Task::new("T1", 1)], false).unwrap();

    std::fs::write(orch.store().lock_path(), "held by another process").unwrap();
    let err = orch.skip(Phase::Brainstorm).unwrap_err();
    assert!(
        matches!(err, Error::Store(StoreError::LockExhausted { attempts: 3, .. })),
        "{err}"
    );

    assert!(orch.status().is_err());

    std::fs::remove_file(orch.store().lock_path()).unwrap();
    let graph = orch.status().unwrap().unwrap();
    assert!(graph.skipped_phases.is_empty());
    orch.skip(Phase::Brainstorm).unwrap();
}
