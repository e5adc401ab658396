//! `wavefront admit` and `wavefront retry` commands.

use crate::admission::Admission;
use crate::orchestrator::Orchestrator;

/// Execute the `admit` command.
///
/// # Errors
///
/// Returns the rejection message when the task may not start.
pub fn run(
    orch: &Orchestrator<'_>,
    task: &str,
    session: Option<&str>,
    check_only: bool,
) -> Result<(), String> {
    let admission = if check_only {
        orch.check_admission(task)
    } else {
        orch.admit(task, session)
    }
    .map_err(|e| e.to_string())?;

    match admission {
        None => println!("No active orchestration; {task} allowed."),
        Some(Admission::Untracked) => println!("{task} is not tracked; allowed."),
        Some(Admission::Tracked) if check_only => println!("{task} may start."),
        Some(Admission::Tracked) => println!("{task} admitted."),
    }
    Ok(())
}

/// Execute the `retry` command.
///
/// # Errors
///
/// Returns an error string without an orchestration.
pub fn retry(orch: &Orchestrator<'_>, tasks: &[String]) -> Result<(), String> {
    let skipped = orch.retry(tasks).map_err(|e| e.to_string())?;
    for id in tasks.iter().filter(|id| !skipped.contains(id)) {
        println!("{id} reset to pending.");
    }
    for id in &skipped {
        println!("{id} skipped: not a failed task.");
    }
    Ok(())
}
