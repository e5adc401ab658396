//! Phase transition validator.
//!
//! Decides whether an action may run given the current phase, and performs
//! validated phase changes. Checks here are pure over a [`TaskGraph`];
//! callers hold the store lock around any mutation.

use std::path::Path;

use crate::config::{ActionConfig, ArtifactLocation, Config};
use crate::error::Rejection;
use crate::graph::{Phase, PhaseArtifact, TaskGraph};
use crate::ports::FileSystem;

/// How an action relates to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCheck {
    /// Utility action; phase validation does not apply.
    Exempt,
    /// The action moves the workflow into this phase.
    Enter(Phase),
    /// The action maps to no phase (only allowed while executing).
    Unclassified,
}

/// Resolves recorded artifact paths against the project root.
pub struct ArtifactProbe<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
}

impl<'a> ArtifactProbe<'a> {
    /// Creates a probe rooted at `root`.
    #[must_use]
    pub fn new(fs: &'a dyn FileSystem, root: &'a Path) -> Self {
        Self { fs, root }
    }

    /// Returns `true` if the artifact file exists.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.fs.exists(&self.root.join(path))
    }
}

/// Classifies an action name without looking at the graph.
#[must_use]
pub fn classify_action(actions: &ActionConfig, action: &str) -> ActionCheck {
    if actions.is_exempt(action) {
        ActionCheck::Exempt
    } else if let Some(phase) = actions.target_phase(action) {
        ActionCheck::Enter(phase)
    } else {
        ActionCheck::Unclassified
    }
}

/// Validates an action against the graph's current phase.
///
/// # Errors
///
/// Returns a [`Rejection`] naming the violated rule.
pub fn check_action(
    graph: &TaskGraph,
    actions: &ActionConfig,
    action: &str,
    probe: &ArtifactProbe<'_>,
) -> Result<ActionCheck, Rejection> {
    let check = classify_action(actions, action);
    match check {
        ActionCheck::Exempt => {}
        ActionCheck::Enter(target) => check_transition(graph, target, probe)?,
        ActionCheck::Unclassified => {
            if graph.current_phase != Phase::Execute {
                return Err(Rejection::UnknownAction {
                    action: action.to_string(),
                    current: graph.current_phase,
                });
            }
        }
    }
    Ok(check)
}

/// Checks the transition table and then the target's artifact prerequisite.
///
/// # Errors
///
/// Returns [`Rejection::IllegalTransition`] for an edge outside the table,
/// or an artifact rejection when the prerequisite is not met.
pub fn check_transition(
    graph: &TaskGraph,
    target: Phase,
    probe: &ArtifactProbe<'_>,
) -> Result<(), Rejection> {
    let current = graph.current_phase;
    if !current.can_transition_to(target) {
        return Err(Rejection::IllegalTransition {
            current,
            target,
            allowed: phase_list(current.successors(), ", "),
            hint: next_hint(current),
        });
    }
    check_prerequisite(graph, target, probe)
}

/// Checks that the phase `target` depends on has a usable artifact.
///
/// # Errors
///
/// Returns [`Rejection::ArtifactNotRecorded`] or [`Rejection::ArtifactNotFound`].
pub fn check_prerequisite(
    graph: &TaskGraph,
    target: Phase,
    probe: &ArtifactProbe<'_>,
) -> Result<(), Rejection> {
    let Some(required) = target.prerequisite() else {
        return Ok(());
    };
    match graph.artifact(required) {
        None => Err(Rejection::ArtifactNotRecorded { target, required }),
        Some(PhaseArtifact::Completed) => Ok(()),
        Some(PhaseArtifact::File(path)) if probe.exists(path) => Ok(()),
        Some(PhaseArtifact::File(path)) => {
            Err(Rejection::ArtifactNotFound { target, required, path: path.clone() })
        }
    }
}

/// Moves the graph into `target`, optionally recording the artifact it produced.
///
/// Re-entering the current phase is allowed and is how an artifact is
/// recorded after the phase's work is done. Entering `execute` for the first
/// time starts wave 1 with an unevaluated gate.
///
/// # Errors
///
/// Returns a [`Rejection`] if the transition or the artifact path is refused.
pub fn advance_phase(
    graph: &mut TaskGraph,
    target: Phase,
    artifact: Option<PhaseArtifact>,
    config: &Config,
    probe: &ArtifactProbe<'_>,
) -> Result<(), Rejection> {
    check_transition(graph, target, probe)?;

    if let Some(PhaseArtifact::File(path)) = &artifact {
        match config.artifact_location(probe.root, path) {
            ArtifactLocation::Allowed => {}
            ArtifactLocation::Legacy => {
                tracing::warn!(%path, "artifact recorded under a deprecated directory");
            }
            ArtifactLocation::Outside => {
                return Err(Rejection::ArtifactOutsideAllowedDirs {
                    path: path.clone(),
                    allowed: config.allowed_dirs(),
                });
            }
        }
    }

    let previous = graph.current_phase;
    if target == Phase::Execute && previous != Phase::Execute {
        graph.current_wave = 1;
        graph.wave_gates.entry(1).or_default();
    }
    graph.current_phase = target;

    if let Some(artifact) = artifact {
        match (target, artifact.path()) {
            (Phase::Specify, Some(path)) => graph.spec_file = Some(path.to_string()),
            (Phase::Architecture, Some(path)) => graph.plan_file = Some(path.to_string()),
            _ => {}
        }
        tracing::info!(phase = %target, %artifact, "phase artifact recorded");
        graph.phase_artifacts.insert(target, artifact);
    }
    if previous != target {
        tracing::info!(from = %previous, to = %target, "phase advanced");
    }
    Ok(())
}

/// Records a skippable phase as bypassed.
///
/// `brainstorm` may only be skipped from `init`, `clarify` only from
/// `specify`. The current phase does not change; the transition table
/// already lists the edge around the skipped phase.
///
/// # Errors
///
/// Returns [`Rejection::NotSkippable`] otherwise.
pub fn skip_phase(graph: &mut TaskGraph, phase: Phase) -> Result<(), Rejection> {
    let current = graph.current_phase;
    let skippable_from = match phase {
        Phase::Brainstorm => Some(Phase::Init),
        Phase::Clarify => Some(Phase::Specify),
        _ => None,
    };
    if !phase.is_skippable() || skippable_from != Some(current) {
        let hint = match skippable_from {
            Some(from) => format!("skip {phase} only while in the {from} phase"),
            None => "only brainstorm and clarify can be skipped".to_string(),
        };
        return Err(Rejection::NotSkippable { phase, current, hint });
    }
    if graph.skipped_phases.insert(phase) {
        tracing::info!(%phase, "phase skipped");
    }
    Ok(())
}

fn phase_list(phases: &[Phase], separator: &str) -> String {
    phases.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(separator)
}

fn next_hint(current: Phase) -> String {
    match current {
        Phase::Execute => "keep executing waves; execute is the final phase".to_string(),
        _ => format!("run the {} phase next", phase_list(current.successors(), " or ")),
    }
}
