//! `wavefront complete`, `review`, and `spec-check` commands.
//!
//! Worker output arrives on stdin; `dispatch` reads it and passes it in.

use crate::completion::{CompletionEvent, CompletionOutcome};
use crate::orchestrator::Orchestrator;

/// Prints a completion outcome.
pub(crate) fn report(outcome: &CompletionOutcome) {
    match outcome {
        CompletionOutcome::Skipped => println!("Review role; implementation status unchanged."),
        CompletionOutcome::NoActiveOrchestration => println!("No active orchestration."),
        CompletionOutcome::NoTaskResolved => println!("No task ID found; nothing recorded."),
        CompletionOutcome::CrashDetected { failed } if failed.is_empty() => {
            println!("No task ID in output and no executing tasks; nothing recorded.");
        }
        CompletionOutcome::CrashDetected { failed } => {
            println!("Worker crash detected; marked failed: {}", failed.join(", "));
        }
        CompletionOutcome::Untracked { task } => println!("{task} is not tracked; nothing recorded."),
        CompletionOutcome::AlreadyRecorded { task } => {
            println!("{task} already recorded; no changes.");
        }
        CompletionOutcome::Recorded(done) => {
            let tests = match done.tests_passed {
                Some(true) => "passing",
                Some(false) => "FAILING",
                None => "no evidence",
            };
            println!(
                "{} implemented (tests: {tests}, new tests: {}, files: {}).",
                done.task,
                done.new_tests.unwrap_or(0),
                done.files_modified
            );
            if let Some(wave) = done.wave_ready {
                println!("Wave {wave} implemented. Next: run `wavefront gate`.");
            }
        }
    }
}

/// Execute the `complete` command.
///
/// # Errors
///
/// Returns an error string for infrastructure failures.
pub fn run(
    orch: &Orchestrator<'_>,
    role: &str,
    task: Option<&str>,
    session: Option<&str>,
    output: &str,
) -> Result<(), String> {
    let event = CompletionEvent {
        role: orch.config().roles.classify(role),
        task_id: task,
        session_id: session,
        output,
    };
    let outcome = orch.complete(&event).map_err(|e| e.to_string())?;
    report(&outcome);
    Ok(())
}

/// Execute the `review` command.
///
/// # Errors
///
/// Returns an error string for an unknown task or without an orchestration.
pub fn review(orch: &Orchestrator<'_>, task: &str, output: &str) -> Result<(), String> {
    let status = orch.review(task, output).map_err(|e| e.to_string())?;
    println!("{task} review: {status}");
    Ok(())
}

/// Execute the `spec-check` command.
///
/// # Errors
///
/// Returns an error string without an orchestration.
pub fn spec_check(orch: &Orchestrator<'_>, wave: Option<u32>, output: &str) -> Result<(), String> {
    let check = orch.spec_check(wave, output).map_err(|e| e.to_string())?;
    println!(
        "Wave {} spec alignment: {} ({} critical, {} high, {} medium, {} low)",
        check.wave,
        check.verdict,
        check.critical_count,
        check.high_count,
        check.medium_findings.len(),
        check.low_findings.len()
    );
    for finding in &check.critical_findings {
        println!("  CRITICAL: {finding}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::Config;
    use crate::graph::{ReviewStatus, Task, TaskStatus};
    use crate::testing::test_context;

    #[test]
    fn complete_review_and_spec_check_update_the_graph() {
        let (ctx, _fakes) = test_context();
        let orch = Orchestrator::new(&ctx, Config::default(), Path::new("/repo"));
        orch.init("demo", vec![Task::new("T1", 1)], false).unwrap();

        run(&orch, "implementer", Some("T1"), None, "12 passing (40ms)").unwrap();
        review(&orch, "T1", "CRITICAL: token logged in plain text").unwrap();
        spec_check(&orch, None, "VERDICT: PASSED").unwrap();

        let graph = orch.status().unwrap().unwrap();
        let task = graph.task("T1").unwrap();
        assert_eq!(task.status, TaskStatus::Implemented);
        assert_eq!(task.tests_passed, Some(true));
        assert_eq!(task.review_status, Some(ReviewStatus::Blocked));
        assert_eq!(graph.spec_check.unwrap().wave, 1);
    }

    #[test]
    fn review_of_unknown_task_fails() {
        let (ctx, _fakes) = test_context();
        let orch = Orchestrator::new(&ctx, Config::default(), Path::new("/repo"));
        orch.init("demo", vec![Task::new("T1", 1)], false).unwrap();
        let err = review(&orch, "T4", "VERDICT: PASSED").unwrap_err();
        assert!(err.contains("T4 is not in the task graph"));
    }
}
