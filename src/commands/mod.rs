//! Command dispatch and handlers.

pub mod admit;
pub mod complete;
pub mod gate;
pub mod hook;
pub mod init;
pub mod phase;
pub mod status;

use std::io::{self, Read};

use crate::cli::{Cli, Command};
use crate::context::ServiceContext;
use crate::orchestrator::Orchestrator;

/// Dispatch a parsed command to its handler using live services and stdin.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let ctx = ServiceContext::live();
    dispatch_with_context(cli, &ctx, &mut io::stdin())
}

fn read_input(input: &mut dyn Read) -> Result<String, String> {
    let mut text = String::new();
    input.read_to_string(&mut text).map_err(|e| format!("failed to read stdin: {e}"))?;
    Ok(text)
}

/// Dispatch a command with the given service context and input stream.
///
/// # Errors
///
/// Returns an error string if configuration cannot be loaded or the handler
/// fails.
pub fn dispatch_with_context(
    cli: &Cli,
    ctx: &ServiceContext,
    input: &mut dyn Read,
) -> Result<(), String> {
    let root = cli.root.as_path();
    let orch = Orchestrator::open(ctx, root).map_err(|e| e.to_string())?;
    match &cli.command {
        Command::Init { title, tasks, force } => {
            init::run(&orch, ctx, root, title.as_deref(), tasks.as_deref(), *force)
        }
        Command::LoadTasks { file } => init::load_tasks(&orch, ctx, root, file),
        Command::Status { json } => status::run(&orch, *json),
        Command::CheckPhase { action } => phase::check(&orch, action),
        Command::Advance { phase, artifact, completed } => {
            phase::advance(&orch, *phase, artifact.as_deref(), *completed)
        }
        Command::Skip { phase } => phase::skip(&orch, *phase),
        Command::Admit { task, session, check } => {
            admit::run(&orch, task, session.as_deref(), *check)
        }
        Command::Complete { role, task, session } => {
            let output = read_input(input)?;
            complete::run(&orch, role, task.as_deref(), session.as_deref(), &output)
        }
        Command::Review { task } => complete::review(&orch, task, &read_input(input)?),
        Command::SpecCheck { wave } => complete::spec_check(&orch, *wave, &read_input(input)?),
        Command::Gate { wave, json } => gate::run(&orch, *wave, *json),
        Command::Retry { tasks } => admit::retry(&orch, tasks),
        Command::Hook { stage } => hook::run(&orch, *stage, &read_input(input)?),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::testing::test_context;

    fn dispatch_args(ctx: &ServiceContext, args: &[&str], stdin: &str) -> Result<(), String> {
        let cli = Cli::try_parse_from(args).unwrap();
        dispatch_with_context(&cli, ctx, &mut stdin.as_bytes())
    }

    #[test]
    fn routes_commands_through_one_context() {
        let (ctx, fakes) = test_context();
        dispatch_args(&ctx, &["wavefront", "--root", "/repo", "init", "--title", "demo"], "")
            .unwrap();
        assert!(fakes.fs.get(std::path::Path::new("/repo/.wavefront/state/task-graph.json")).is_some());

        dispatch_args(&ctx, &["wavefront", "--root", "/repo", "status"], "").unwrap();
        let err =
            dispatch_args(&ctx, &["wavefront", "--root", "/repo", "check-phase", "deploy"], "")
                .unwrap_err();
        assert!(err.contains("deploy"));
    }

    #[test]
    fn hook_reads_event_from_input() {
        let (ctx, _fakes) = test_context();
        dispatch_args(&ctx, &["wavefront", "--root", "/repo", "init"], "").unwrap();
        let event = r#"{"action": "status"}"#;
        dispatch_args(&ctx, &["wavefront", "--root", "/repo", "hook", "pre"], event).unwrap();
    }
}
