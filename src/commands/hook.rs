//! `wavefront hook` command: the pre/post action entry points.
//!
//! The event arrives as a JSON object on stdin. A rejected pre-action check
//! exits non-zero so the calling tool blocks the action.

use crate::admission::Admission;
use crate::cli::HookStage;
use crate::commands::complete;
use crate::orchestrator::{ActionEvent, AfterAction, Orchestrator};

fn parse_event(input: &str) -> Result<ActionEvent, String> {
    if input.trim().is_empty() {
        return Err("hook event missing: pass a JSON object on stdin".to_string());
    }
    serde_json::from_str(input).map_err(|e| format!("invalid hook event: {e}"))
}

/// Execute the `hook` command.
///
/// # Errors
///
/// Returns the rejection message when a pre-action check blocks, or an error
/// string for a malformed event or infrastructure failure.
pub fn run(orch: &Orchestrator<'_>, stage: HookStage, input: &str) -> Result<(), String> {
    let event = parse_event(input)?;
    match stage {
        HookStage::Pre => {
            let before = orch.before_action(&event).map_err(|e| e.to_string())?;
            match before.admission {
                Some((task, Admission::Tracked)) => println!("{task} admitted."),
                Some((task, Admission::Untracked)) => println!("{task} is not tracked; allowed."),
                None => println!("'{}' allowed.", event.action),
            }
        }
        HookStage::Post => match orch.after_action(&event).map_err(|e| e.to_string())? {
            AfterAction::NoActiveOrchestration => println!("No active orchestration."),
            AfterAction::PhaseEntered(phase) => println!("Phase: {phase}"),
            AfterAction::Reviewed { task, status } => println!("{task} review: {status}"),
            AfterAction::SpecChecked { wave, critical } => {
                println!("Wave {wave} spec alignment recorded ({critical} critical).");
            }
            AfterAction::Completion(outcome) => complete::report(&outcome),
            AfterAction::Ignored => println!("Nothing to record for '{}'.", event.action),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::Config;
    use crate::graph::{Phase, Task, TaskStatus};
    use crate::testing::test_context;

    fn executing(ctx: &crate::context::ServiceContext) -> Orchestrator<'_> {
        let orch = Orchestrator::new(ctx, Config::default(), Path::new("/repo"));
        orch.init("demo", vec![Task::new("T1", 1), Task::new("T2", 2)], false).unwrap();
        orch.store()
            .with_lock(|graph| {
                graph.current_phase = Phase::Execute;
                graph.current_wave = 1;
                graph.gate_mut(1);
                Ok::<_, crate::error::StoreError>(())
            })
            .unwrap();
        orch
    }

    #[test]
    fn pre_hook_blocks_future_wave_task() {
        let (ctx, _fakes) = test_context();
        let orch = executing(&ctx);
        let event = r#"{"action": "task", "args": {"task_id": "T2"}, "session_id": "s-2"}"#;
        let err = run(&orch, HookStage::Pre, event).unwrap_err();
        assert!(err.contains("T2"));
        assert!(err.contains("Next:"));
    }

    #[test]
    fn pre_then_post_records_completion_for_the_session() {
        let (ctx, _fakes) = test_context();
        let orch = executing(&ctx);
        let pre = r#"{"action": "task", "args": {"task_id": "T1"}, "session_id": "s-1"}"#;
        run(&orch, HookStage::Pre, pre).unwrap();

        let post = r#"{"action": "task", "role": "implementer", "session_id": "s-1",
                       "output": "test result: ok. 3 passed; 0 failed"}"#;
        run(&orch, HookStage::Post, post).unwrap();

        let graph = orch.status().unwrap().unwrap();
        assert_eq!(graph.task("T1").unwrap().status, TaskStatus::Implemented);
        assert!(graph.executing_tasks.is_empty());
    }

    #[test]
    fn malformed_event_is_rejected() {
        let (ctx, _fakes) = test_context();
        let orch = executing(&ctx);
        assert!(run(&orch, HookStage::Pre, "").is_err());
        assert!(run(&orch, HookStage::Post, "{not json").is_err());
    }
}
