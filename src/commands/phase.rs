//! `wavefront check-phase`, `advance`, and `skip` commands.

use crate::graph::{Phase, PhaseArtifact};
use crate::orchestrator::Orchestrator;
use crate::transition::ActionCheck;

/// Execute the `check-phase` command.
///
/// # Errors
///
/// Returns the rejection message when the action may not run now.
pub fn check(orch: &Orchestrator<'_>, action: &str) -> Result<(), String> {
    match orch.check_action(action).map_err(|e| e.to_string())? {
        None => println!("No active orchestration; '{action}' allowed."),
        Some(ActionCheck::Exempt) => println!("'{action}' is exempt from phase checks."),
        Some(ActionCheck::Enter(phase)) => println!("'{action}' may enter the {phase} phase."),
        Some(ActionCheck::Unclassified) => {
            println!("'{action}' allowed during execute.");
        }
    }
    Ok(())
}

/// Execute the `advance` command.
///
/// # Errors
///
/// Returns the rejection message when the transition is refused.
pub fn advance(
    orch: &Orchestrator<'_>,
    phase: Phase,
    artifact: Option<&str>,
    completed: bool,
) -> Result<(), String> {
    let artifact = if completed {
        Some(PhaseArtifact::Completed)
    } else {
        artifact.map(|path| PhaseArtifact::File(path.to_string()))
    };
    let recorded = artifact.clone();
    let previous = orch.advance(phase, artifact).map_err(|e| e.to_string())?;
    if previous == phase {
        println!("Phase: {phase}");
    } else {
        println!("Phase: {previous} -> {phase}");
    }
    if let Some(artifact) = recorded {
        println!("Recorded {phase} artifact: {artifact}");
    }
    Ok(())
}

/// Execute the `skip` command.
///
/// # Errors
///
/// Returns the rejection message when the phase cannot be skipped.
pub fn skip(orch: &Orchestrator<'_>, phase: Phase) -> Result<(), String> {
    orch.skip(phase).map_err(|e| e.to_string())?;
    println!("Skipped {phase}.");
    Ok(())
}
