//! Workflow phases, their transition table, and phase artifacts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the ordered workflow stages.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Orchestration created, nothing produced yet.
    #[default]
    Init,
    /// Open-ended idea exploration.
    Brainstorm,
    /// Writing the specification document.
    Specify,
    /// Resolving open questions in the specification.
    Clarify,
    /// Producing the architecture / plan document.
    Architecture,
    /// Breaking the plan into waves of tasks.
    Decompose,
    /// Running tasks wave by wave.
    Execute,
}

impl Phase {
    /// Every phase in workflow order.
    pub const ALL: [Self; 7] = [
        Self::Init,
        Self::Brainstorm,
        Self::Specify,
        Self::Clarify,
        Self::Architecture,
        Self::Decompose,
        Self::Execute,
    ];

    /// Stable name used in the document, logs, and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Brainstorm => "brainstorm",
            Self::Specify => "specify",
            Self::Clarify => "clarify",
            Self::Architecture => "architecture",
            Self::Decompose => "decompose",
            Self::Execute => "execute",
        }
    }

    /// Phases directly reachable from this one.
    ///
    /// Skipping a phase is encoded here: `init -> specify` bypasses
    /// `brainstorm` and `specify -> architecture` bypasses `clarify`.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Init => &[Self::Brainstorm, Self::Specify],
            Self::Brainstorm => &[Self::Specify],
            Self::Specify => &[Self::Clarify, Self::Architecture],
            Self::Clarify => &[Self::Architecture],
            Self::Architecture => &[Self::Decompose],
            Self::Decompose | Self::Execute => &[Self::Execute],
        }
    }

    /// Returns `true` if moving from `self` to `target` is a legal edge.
    ///
    /// Staying in the same phase is always legal.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self == target || self.successors().contains(&target)
    }

    /// Returns `true` for phases that may be explicitly bypassed.
    #[must_use]
    pub const fn is_skippable(self) -> bool {
        matches!(self, Self::Brainstorm | Self::Clarify)
    }

    /// The phase whose artifact must exist before entering this one.
    #[must_use]
    pub const fn prerequisite(self) -> Option<Self> {
        match self {
            Self::Clarify | Self::Architecture => Some(Self::Specify),
            Self::Decompose | Self::Execute => Some(Self::Architecture),
            Self::Init | Self::Brainstorm | Self::Specify => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown phase '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Output recorded for a finished phase.
///
/// Stored as a plain string: the sentinel `"completed"` or a file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PhaseArtifact {
    /// The phase finished without producing a file.
    Completed,
    /// Path of the document the phase produced.
    File(String),
}

impl PhaseArtifact {
    const COMPLETED: &'static str = "completed";

    /// Returns the artifact's path, or `None` for [`PhaseArtifact::Completed`].
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Completed => None,
            Self::File(path) => Some(path),
        }
    }
}

impl From<String> for PhaseArtifact {
    fn from(value: String) -> Self {
        if value == Self::COMPLETED {
            Self::Completed
        } else {
            Self::File(value)
        }
    }
}

impl From<PhaseArtifact> for String {
    fn from(value: PhaseArtifact) -> Self {
        match value {
            PhaseArtifact::Completed => PhaseArtifact::COMPLETED.to_string(),
            PhaseArtifact::File(path) => path,
        }
    }
}

impl fmt::Display for PhaseArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str(Self::COMPLETED),
            Self::File(path) => f.write_str(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDGES: [(Phase, Phase); 9] = [
        (Phase::Init, Phase::Brainstorm),
        (Phase::Init, Phase::Specify),
        (Phase::Brainstorm, Phase::Specify),
        (Phase::Specify, Phase::Clarify),
        (Phase::Specify, Phase::Architecture),
        (Phase::Clarify, Phase::Architecture),
        (Phase::Architecture, Phase::Decompose),
        (Phase::Decompose, Phase::Execute),
        (Phase::Execute, Phase::Execute),
    ];

    #[test]
    fn transition_table_is_exact() {
        for from in Phase::ALL {
            for to in Phase::ALL {
                let expected = from == to || EDGES.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn multi_step_jumps_are_rejected() {
        assert!(!Phase::Init.can_transition_to(Phase::Architecture));
        assert!(!Phase::Brainstorm.can_transition_to(Phase::Clarify));
        assert!(!Phase::Specify.can_transition_to(Phase::Decompose));
        assert!(!Phase::Execute.can_transition_to(Phase::Decompose));
    }

    #[test]
    fn only_brainstorm_and_clarify_are_skippable() {
        let skippable: Vec<Phase> = Phase::ALL.into_iter().filter(|p| p.is_skippable()).collect();
        assert_eq!(skippable, vec![Phase::Brainstorm, Phase::Clarify]);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Architecture".parse::<Phase>(), Ok(Phase::Architecture));
        assert!("deploy".parse::<Phase>().unwrap_err().contains("unknown phase"));
    }

    #[test]
    fn artifact_serializes_as_plain_string() {
        let json = serde_json::to_string(&PhaseArtifact::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let file: PhaseArtifact = serde_json::from_str("\".wavefront/specs/a.md\"").unwrap();
        assert_eq!(file.path(), Some(".wavefront/specs/a.md"));
    }
}
