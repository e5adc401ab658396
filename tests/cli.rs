//! Integration tests for top-level CLI behavior.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn run_wavefront(root: &Path, args: &[&str]) -> Output {
    run_with_stdin(root, args, "")
}

fn run_with_stdin(root: &Path, args: &[&str], stdin: &str) -> Output {
    let bin = env!("CARGO_BIN_EXE_wavefront");
    let mut child = Command::new(bin)
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("WAVEFRONT_STATE_DIR")
        .env_remove("WAVEFRONT_LOCK_ATTEMPTS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run wavefront binary");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("failed to write stdin");
    child.wait_with_output().expect("failed to wait for wavefront")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn status_without_orchestration() {
    let root = tempfile::tempdir().unwrap();
    let output = run_wavefront(root.path(), &["status"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No active orchestration."));
}

#[test]
fn init_then_status_shows_tasks() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(
        root.path().join("tasks.yaml"),
        "title: auth\ntasks:\n  - id: T1\n    wave: 1\n  - id: T2\n    wave: 2\n    depends_on: [T1]\n",
    )
    .unwrap();

    let output = run_wavefront(root.path(), &["init", "--tasks", "tasks.yaml"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(root.path().join(".wavefront/state/task-graph.json").exists());

    let output = run_wavefront(root.path(), &["status"]);
    let text = stdout(&output);
    assert!(text.contains("Title: auth"));
    assert!(text.contains("Phase: init"));
    assert!(text.contains("T2"));

    let again = run_wavefront(root.path(), &["init"]);
    assert!(!again.status.success());
    assert!(stderr(&again).contains("--force"));
}

#[test]
fn check_phase_rejects_out_of_order_action() {
    let root = tempfile::tempdir().unwrap();
    run_wavefront(root.path(), &["init"]);

    let output = run_wavefront(root.path(), &["check-phase", "implement"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("cannot move from 'init' to 'execute'"));
    assert!(err.contains("Next:"));

    let output = run_wavefront(root.path(), &["check-phase", "status"]);
    assert!(output.status.success());
}

#[test]
fn advance_records_artifact_and_rejects_missing_prerequisite() {
    let root = tempfile::tempdir().unwrap();
    run_wavefront(root.path(), &["init"]);

    let output = run_wavefront(root.path(), &["advance", "architecture"]);
    assert!(!output.status.success());

    std::fs::create_dir_all(root.path().join(".wavefront/specs")).unwrap();
    std::fs::write(root.path().join(".wavefront/specs/auth.md"), "# Auth\n").unwrap();
    let output =
        run_wavefront(root.path(), &["advance", "specify", "--artifact", ".wavefront/specs/auth.md"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Phase: init -> specify"));

    let output = run_wavefront(root.path(), &["advance", "architecture", "--completed"]);
    assert!(output.status.success(), "{}", stderr(&output));
}

#[test]
fn gate_failure_exits_non_zero() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("tasks.json"), r#"[{"id": "T1", "wave": 1}]"#).unwrap();
    run_wavefront(root.path(), &["init", "--tasks", "tasks.json"]);

    let output = run_wavefront(root.path(), &["gate", "--wave", "1"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("missing test evidence: T1"));
    assert!(stderr(&output).contains("wave 1 gate blocked"));
}

#[test]
fn hook_pre_allows_exempt_action_from_stdin() {
    let root = tempfile::tempdir().unwrap();
    run_wavefront(root.path(), &["init"]);

    let output = run_with_stdin(root.path(), &["hook", "pre"], r#"{"action": "status"}"#);
    assert!(output.status.success(), "{}", stderr(&output));

    let output = run_with_stdin(root.path(), &["hook", "pre"], r#"{"action": "deploy"}"#);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("deploy"));
}

#[test]
fn invalid_subcommand_exits_with_error() {
    let root = tempfile::tempdir().unwrap();
    let output = run_wavefront(root.path(), &["nonsense"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unrecognized subcommand"));
}
