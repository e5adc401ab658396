//! Error types.
//!
//! [`Rejection`] covers ordering violations and missing prerequisites: the
//! attempted action is refused and nothing is corrupted. [`StoreError`]
//! covers infrastructure failures around the persisted document.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::{Phase, UnmetDependency};

/// Failures of the persistence and locking layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The lock marker stayed in place for every attempt.
    #[error(
        "could not acquire task graph lock {} after {attempts} attempts; another process may be \
         stuck holding it. Next: check for a running orchestration, then remove the lock file if stale",
        .path.display()
    )]
    LockExhausted {
        /// Lock marker path.
        path: PathBuf,
        /// Number of attempts made.
        attempts: u32,
    },
    /// Reading or writing a state file failed.
    #[error("I/O error on {}: {message}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// The graph could not be serialized.
    #[error("failed to serialize task graph: {0}")]
    Serialize(String),
}

/// An attempted action was refused.
///
/// Every message names the rule, the values involved, and a `Next:` hint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The target phase is not reachable from the current phase.
    #[error(
        "phase order violation: cannot move from '{current}' to '{target}' (allowed: {allowed}). \
         Next: {hint}"
    )]
    IllegalTransition {
        /// Current phase.
        current: Phase,
        /// Attempted phase.
        target: Phase,
        /// Legal targets from the current phase.
        allowed: String,
        /// Suggested next action.
        hint: String,
    },
    /// An action that maps to no phase was attempted outside `execute`.
    #[error(
        "action '{action}' is not part of the workflow and cannot run during the '{current}' phase. \
         Next: finish the workflow phases or use an exempt utility action"
    )]
    UnknownAction {
        /// Action name.
        action: String,
        /// Current phase.
        current: Phase,
    },
    /// A prerequisite phase has no recorded artifact.
    #[error(
        "{required} phase artifact not recorded; '{target}' requires it. \
         Next: complete the {required} phase first"
    )]
    ArtifactNotRecorded {
        /// Phase being entered.
        target: Phase,
        /// Phase whose artifact is missing.
        required: Phase,
    },
    /// A prerequisite artifact is recorded but its file is gone.
    #[error(
        "{required} artifact file not found: {path}; '{target}' requires it. \
         Next: restore the file or re-run the {required} phase"
    )]
    ArtifactNotFound {
        /// Phase being entered.
        target: Phase,
        /// Phase whose artifact is missing.
        required: Phase,
        /// Recorded path.
        path: String,
    },
    /// An artifact path lies outside the specs and plans directories.
    #[error(
        "artifact path {path} is outside the allowed directories ({allowed}). \
         Next: write the artifact under one of those directories"
    )]
    ArtifactOutsideAllowedDirs {
        /// Rejected path.
        path: String,
        /// Allowed directories.
        allowed: String,
    },
    /// The phase cannot be skipped from here.
    #[error("phase '{phase}' cannot be skipped while in '{current}'. Next: {hint}")]
    NotSkippable {
        /// Phase to skip.
        phase: Phase,
        /// Current phase.
        current: Phase,
        /// Suggested next action.
        hint: String,
    },
    /// Tasks can only be loaded while decomposing.
    #[error(
        "tasks can only be loaded during the 'decompose' phase (current: '{current}'). \
         Next: advance to decompose first"
    )]
    TaskLoadOutsideDecompose {
        /// Current phase.
        current: Phase,
    },
    /// The task belongs to a wave that has not started.
    #[error(
        "wave order violation: task {task} is in wave {wave} but the current wave is {current_wave}. \
         Next: finish wave {current_wave} and run the wave gate"
    )]
    FutureWave {
        /// Task ID.
        task: String,
        /// Task's wave.
        wave: u32,
        /// Current wave.
        current_wave: u32,
    },
    /// Dependencies are missing or not done.
    #[error(
        "task {task} has unmet dependencies: {}. Next: complete those tasks first",
        join(.unmet)
    )]
    UnmetDependencies {
        /// Task ID.
        task: String,
        /// Every unmet dependency.
        unmet: Vec<UnmetDependency>,
    },
    /// The previous wave's gate has never been evaluated.
    #[error(
        "wave {previous} gate has not been run; task {task} (wave {wave}) cannot start. \
         Next: run the wave gate for wave {previous}"
    )]
    GateNotRun {
        /// Task ID.
        task: String,
        /// Task's wave.
        wave: u32,
        /// Wave whose gate is missing.
        previous: u32,
    },
    /// The previous wave's gate was evaluated and blocked.
    #[error(
        "wave {previous} gate is blocked ({failed_tests} task(s) without passing tests, \
         {critical} critical finding(s)); task {task} (wave {wave}) cannot start. \
         Next: fix the failures and re-run the wave gate for wave {previous}"
    )]
    GateBlocked {
        /// Task ID.
        task: String,
        /// Task's wave.
        wave: u32,
        /// Blocked wave.
        previous: u32,
        /// Tasks without passing test evidence.
        failed_tests: usize,
        /// Outstanding critical findings.
        critical: usize,
    },
    /// The gate was requested for a wave that has not started.
    #[error(
        "wave {wave} has not started (current wave is {current_wave}); its gate cannot run yet. \
         Next: pass the wave gate for wave {current_wave} first"
    )]
    WaveNotStarted {
        /// Requested wave.
        wave: u32,
        /// Current wave.
        current_wave: u32,
    },
    /// The previous wave's gate exists but has not passed.
    #[error(
        "wave {previous} gate has not passed; task {task} (wave {wave}) cannot start. \
         Next: run the wave gate for wave {previous}"
    )]
    GateNotPassed {
        /// Task ID.
        task: String,
        /// Task's wave.
        wave: u32,
        /// Wave whose gate has not passed.
        previous: u32,
    },
}

fn join(unmet: &[UnmetDependency]) -> String {
    unmet.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// An attempted action was refused.
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// The persistence layer failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The operation needs a task graph and none exists.
    #[error("no active orchestration: task graph not found. Next: run `wavefront init`")]
    NoActiveOrchestration,
    /// A task list failed the graph-construction checks.
    #[error("invalid task graph:\n  {}", .0.join("\n  "))]
    InvalidGraph(Vec<String>),
    /// The configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
    /// Caller-supplied input was unusable.
    #[error("{0}")]
    Input(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskStatus;

    #[test]
    fn unmet_dependencies_message_lists_each() {
        let err = Rejection::UnmetDependencies {
            task: "T2".into(),
            unmet: vec![
                UnmetDependency { id: "T1".into(), status: Some(TaskStatus::Pending) },
                UnmetDependency { id: "T7".into(), status: None },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("T1 (status: pending), T7 (missing)"));
        assert!(message.contains("Next:"));
    }

    #[test]
    fn artifact_messages_are_distinct() {
        let missing = Rejection::ArtifactNotRecorded { target: Phase::Clarify, required: Phase::Specify };
        let gone = Rejection::ArtifactNotFound {
            target: Phase::Clarify,
            required: Phase::Specify,
            path: "x.md".into(),
        };
        assert!(missing.to_string().starts_with("specify phase artifact not recorded"));
        assert!(gone.to_string().contains("artifact file not found: x.md"));
    }
}
