//! Task graph data model.
//!
//! The task graph is the single persisted document describing phase state,
//! tasks, and wave gates for one orchestrated unit of work. Types here are
//! plain data plus queries; locking and persistence live in `store`.

mod gate;
mod phase;
mod spec_check;
mod structure;
mod task;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use gate::WaveGate;
pub use phase::{Phase, PhaseArtifact};
pub use spec_check::{SpecCheck, SpecVerdict};
pub use structure::is_task_id;
pub use task::{ReviewStatus, Task, TaskStatus};

/// Root document for one orchestrated unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    /// Human-readable title of the unit of work.
    #[serde(default)]
    pub title: String,
    /// Specification document produced by the `specify` phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_file: Option<String>,
    /// Plan document produced by the `architecture` phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_file: Option<String>,
    /// Phase the workflow is in.
    #[serde(default)]
    pub current_phase: Phase,
    /// Artifact recorded for each finished phase.
    #[serde(default)]
    pub phase_artifacts: BTreeMap<Phase, PhaseArtifact>,
    /// Phases explicitly bypassed.
    #[serde(default)]
    pub skipped_phases: BTreeSet<Phase>,
    /// Wave currently eligible for execution (1-based).
    #[serde(default = "first_wave")]
    pub current_wave: u32,
    /// All tasks, in decomposition order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Tasks currently assigned to a live worker.
    #[serde(default)]
    pub executing_tasks: BTreeSet<String>,
    /// Gate record per wave number.
    #[serde(default, deserialize_with = "wave_keyed")]
    pub wave_gates: BTreeMap<u32, WaveGate>,
    /// Latest spec-alignment result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_check: Option<SpecCheck>,
    /// When the graph was created.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// When the graph was last changed.
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// Fields written by other tools, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn first_wave() -> u32 {
    1
}

// Map keys arrive as strings once `extra` forces buffered deserialization.
fn wave_keyed<'de, D>(deserializer: D) -> Result<BTreeMap<u32, WaveGate>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, WaveGate>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, gate)| {
            key.parse::<u32>()
                .map(|wave| (wave, gate))
                .map_err(|_| D::Error::custom(format!("invalid wave number '{key}'")))
        })
        .collect()
}

/// A dependency that does not yet satisfy its dependent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetDependency {
    /// The dependency's task ID.
    pub id: String,
    /// Its status, or `None` if no such task exists.
    pub status: Option<TaskStatus>,
}

impl fmt::Display for UnmetDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status: {status})", self.id),
            None => write!(f, "{} (missing)", self.id),
        }
    }
}

impl TaskGraph {
    /// Creates an empty graph in the `init` phase.
    #[must_use]
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            spec_file: None,
            plan_file: None,
            current_phase: Phase::Init,
            phase_artifacts: BTreeMap::new(),
            skipped_phases: BTreeSet::new(),
            current_wave: 1,
            tasks: Vec::new(),
            executing_tasks: BTreeSet::new(),
            wave_gates: BTreeMap::new(),
            spec_check: None,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    /// Looks up a task by ID.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Looks up a task by ID for mutation.
    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Iterates over the tasks of one wave.
    pub fn tasks_in_wave(&self, wave: u32) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.wave == wave)
    }

    /// Highest wave number of any task, or `0` for an empty graph.
    #[must_use]
    pub fn max_wave(&self) -> u32 {
        self.tasks.iter().map(|t| t.wave).max().unwrap_or(0)
    }

    /// Returns the gate record of a wave, if it was ever written.
    #[must_use]
    pub fn gate(&self, wave: u32) -> Option<&WaveGate> {
        self.wave_gates.get(&wave)
    }

    /// Returns the gate record of a wave, creating an unevaluated one.
    pub fn gate_mut(&mut self, wave: u32) -> &mut WaveGate {
        self.wave_gates.entry(wave).or_default()
    }

    /// Lists dependencies of `task` that are missing or not done, in declared order.
    #[must_use]
    pub fn unmet_dependencies(&self, task: &Task) -> Vec<UnmetDependency> {
        task.depends_on
            .iter()
            .filter_map(|dep| match self.task(dep) {
                Some(found) if found.is_done() => None,
                Some(found) => Some(UnmetDependency { id: dep.clone(), status: Some(found.status) }),
                None => Some(UnmetDependency { id: dep.clone(), status: None }),
            })
            .collect()
    }

    /// Returns `true` if every task of `wave` is implemented or completed.
    ///
    /// A wave without tasks is never complete.
    #[must_use]
    pub fn wave_implemented(&self, wave: u32) -> bool {
        let mut tasks = self.tasks_in_wave(wave).peekable();
        tasks.peek().is_some() && tasks.all(Task::is_done)
    }

    /// Returns the artifact recorded for a phase.
    #[must_use]
    pub fn artifact(&self, phase: Phase) -> Option<&PhaseArtifact> {
        self.phase_artifacts.get(&phase)
    }
}
