//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::graph::Phase;

/// Top-level CLI parser for `wavefront`.
#[derive(Debug, Parser)]
#[command(name = "wavefront", version, about = "Phase and wave orchestration for multi-agent delivery")]
pub struct Cli {
    /// Project root holding the `.wavefront` directory.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Which side of an action a hook event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookStage {
    /// The action is about to run.
    Pre,
    /// The action finished.
    Post,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new orchestration.
    Init {
        /// Title of the unit of work.
        #[arg(long)]
        title: Option<String>,
        /// JSON or YAML task list to seed the graph with.
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Replace an existing task graph.
        #[arg(long)]
        force: bool,
    },
    /// Load the decomposed task list (decompose phase only).
    LoadTasks {
        /// JSON or YAML task list.
        file: PathBuf,
    },
    /// Show phase, waves, and tasks.
    Status {
        /// Print the raw task graph as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check whether an action may run in the current phase.
    CheckPhase {
        /// Action name, e.g. `specify` or `/plan`.
        action: String,
    },
    /// Move to a phase, optionally recording its artifact.
    Advance {
        /// Target phase.
        phase: Phase,
        /// Path of the document the phase produced.
        #[arg(long, conflicts_with = "completed")]
        artifact: Option<String>,
        /// Mark the phase finished without a document.
        #[arg(long)]
        completed: bool,
    },
    /// Record a skippable phase as bypassed.
    Skip {
        /// Phase to skip (`brainstorm` or `clarify`).
        phase: Phase,
    },
    /// Admit a task for execution.
    Admit {
        /// Task ID.
        task: String,
        /// Session to bind the task to.
        #[arg(long)]
        session: Option<String>,
        /// Only check admission; do not mark the task executing.
        #[arg(long)]
        check: bool,
    },
    /// Record a finished worker; its output is read from stdin.
    Complete {
        /// Role of the worker.
        #[arg(long)]
        role: String,
        /// Task the worker was on, if known.
        #[arg(long)]
        task: Option<String>,
        /// Session the worker ran in.
        #[arg(long)]
        session: Option<String>,
    },
    /// Record a code review; reviewer output is read from stdin.
    Review {
        /// Reviewed task.
        task: String,
    },
    /// Record a spec-alignment run; its output is read from stdin.
    SpecCheck {
        /// Wave checked (default: current wave).
        #[arg(long)]
        wave: Option<u32>,
    },
    /// Evaluate the wave gate.
    Gate {
        /// Wave to evaluate (default: current wave).
        #[arg(long)]
        wave: Option<u32>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Hand failed tasks back for another attempt.
    Retry {
        /// Task IDs.
        #[arg(required = true)]
        tasks: Vec<String>,
    },
    /// Handle a host event read from stdin as JSON.
    Hook {
        /// Event stage.
        stage: HookStage,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, HookStage};
    use crate::graph::Phase;
    use clap::Parser;

    #[test]
    fn parses_advance_with_artifact() {
        let cli = Cli::parse_from(["wavefront", "advance", "specify", "--artifact", "spec.md"]);
        assert!(matches!(
            cli.command,
            Command::Advance { phase: Phase::Specify, artifact: Some(ref a), completed: false } if a == "spec.md"
        ));
    }

    #[test]
    fn artifact_and_completed_conflict() {
        let result =
            Cli::try_parse_from(["wavefront", "advance", "decompose", "--artifact", "x", "--completed"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_hook_stage_and_global_root() {
        let cli = Cli::parse_from(["wavefront", "hook", "pre", "--root", "/tmp/project"]);
        assert!(matches!(cli.command, Command::Hook { stage: HookStage::Pre }));
        assert_eq!(cli.root, std::path::PathBuf::from("/tmp/project"));
    }

    #[test]
    fn rejects_unknown_phase() {
        let err = Cli::try_parse_from(["wavefront", "skip", "deploy"]).unwrap_err();
        assert!(err.to_string().contains("unknown phase"));
    }

    #[test]
    fn retry_requires_a_task() {
        assert!(Cli::try_parse_from(["wavefront", "retry"]).is_err());
    }
}
