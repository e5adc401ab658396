//! Orchestrator facade.
//!
//! Binds the validators and handlers to the locked task graph store. Every
//! mutating call is one lock region; read-only checks take the lock just
//! long enough to read a fresh graph.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::admission::{self, Admission};
use crate::completion::{self, CompletionEvent, CompletionOutcome, SessionTasks};
use crate::config::{Config, RoleKind};
use crate::context::ServiceContext;
use crate::error::{Error, StoreError};
use crate::gate::{self, GateReport};
use crate::graph::{Phase, PhaseArtifact, ReviewStatus, SpecCheck, Task, TaskGraph, TaskStatus};
use crate::review;
use crate::store::GraphStore;
use crate::transition::{self, ActionCheck, ArtifactProbe};

/// File holding session-to-task bindings, next to the task graph.
pub const SESSIONS_FILE: &str = "sessions.json";

/// A task list as written by the decompose phase.
///
/// Accepts either a bare list of tasks or a document with a `tasks` key,
/// in JSON or YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TaskList {
    /// Document form with an optional title.
    Document {
        /// Title of the unit of work.
        #[serde(default)]
        title: Option<String>,
        /// The tasks.
        tasks: Vec<Task>,
    },
    /// Bare list of tasks.
    Tasks(Vec<Task>),
}

impl TaskList {
    /// Parses a JSON or YAML task list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] when the text is not a task list.
    pub fn parse(text: &str) -> Result<Self, Error> {
        serde_yaml::from_str(text).map_err(|e| Error::Input(format!("invalid task list: {e}")))
    }

    /// Title carried by the document, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Document { title, .. } => title.as_deref(),
            Self::Tasks(_) => None,
        }
    }

    /// Consumes the list, returning its tasks.
    #[must_use]
    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            Self::Document { tasks, .. } | Self::Tasks(tasks) => tasks,
        }
    }
}

/// An action notification from the host event loop.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionEvent {
    /// Action name, e.g. `specify` or `task`.
    pub action: String,
    /// Structured arguments of the action.
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Role of the worker running the action, if it is a worker invocation.
    #[serde(default)]
    pub role: Option<String>,
    /// Session the action runs in.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Raw output, present once the action finished.
    #[serde(default)]
    pub output: Option<String>,
}

impl ActionEvent {
    fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
    }

    fn task_id(&self, ctx: &ServiceContext) -> Option<String> {
        self.arg("task_id")
            .map(str::to_string)
            .or_else(|| self.arg("prompt").and_then(|prompt| ctx.task_ids.task_id(prompt)))
    }
}

/// Result of the pre-action checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeAction {
    /// How the action was classified, or `None` without an orchestration.
    pub action: Option<ActionCheck>,
    /// Admission result when the action started a task.
    pub admission: Option<(String, Admission)>,
}

/// What the post-action handler recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterAction {
    /// No task graph exists.
    NoActiveOrchestration,
    /// The workflow entered a phase.
    PhaseEntered(Phase),
    /// A review was recorded on a task.
    Reviewed {
        /// Reviewed task.
        task: String,
        /// Resolved status.
        status: ReviewStatus,
    },
    /// A spec-alignment run was recorded.
    SpecChecked {
        /// Wave checked.
        wave: u32,
        /// Critical findings.
        critical: usize,
    },
    /// The completion handler ran.
    Completion(CompletionOutcome),
    /// Nothing to record.
    Ignored,
}

/// Entry point for every orchestration operation on one project.
pub struct Orchestrator<'a> {
    ctx: &'a ServiceContext,
    config: Config,
    root: PathBuf,
    store: GraphStore<'a>,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator for the project at `root`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, config: Config, root: &Path) -> Self {
        let store = GraphStore::new(ctx, &config.state_dir(root), config.lock_policy());
        Self { ctx, config, root: root.to_path_buf(), store }
    }

    /// Loads configuration for `root` and creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn open(ctx: &'a ServiceContext, root: &Path) -> Result<Self, Error> {
        Ok(Self::new(ctx, Config::load(ctx, root)?, root))
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &GraphStore<'a> {
        &self.store
    }

    fn probe(&self) -> ArtifactProbe<'_> {
        ArtifactProbe::new(self.ctx.fs.as_ref(), &self.root)
    }

    fn sessions_path(&self) -> PathBuf {
        self.config.state_dir(&self.root).join(SESSIONS_FILE)
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut TaskGraph) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.store.with_lock(f)?.ok_or(Error::NoActiveOrchestration)
    }

    /// Returns a snapshot of the graph, or `None` without an orchestration.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn status(&self) -> Result<Option<TaskGraph>, Error> {
        Ok(self.store.read(TaskGraph::clone)?)
    }

    /// Creates a new task graph, optionally seeded with tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGraph`] if the tasks fail the structure checks,
    /// or an error if a graph exists and `force` is false.
    pub fn init(&self, title: &str, tasks: Vec<Task>, force: bool) -> Result<TaskGraph, Error> {
        let mut graph = TaskGraph::new(title, self.ctx.clock.now());
        graph.tasks = tasks;
        let problems = graph.validate_structure();
        if !problems.is_empty() {
            return Err(Error::InvalidGraph(problems));
        }
        self.store.create(&graph, force)?;
        Ok(graph)
    }

    /// Replaces the task list during the `decompose` phase.
    ///
    /// # Errors
    ///
    /// Returns a rejection outside `decompose`, or [`Error::InvalidGraph`].
    pub fn load_tasks(&self, tasks: Vec<Task>) -> Result<usize, Error> {
        self.mutate(|graph| {
            if graph.current_phase != Phase::Decompose {
                return Err(crate::error::Rejection::TaskLoadOutsideDecompose {
                    current: graph.current_phase,
                }
                .into());
            }
            graph.tasks = tasks;
            let problems = graph.validate_structure();
            if !problems.is_empty() {
                return Err(Error::InvalidGraph(problems));
            }
            graph.executing_tasks.clear();
            tracing::info!(tasks = graph.tasks.len(), waves = graph.max_wave(), "tasks loaded");
            Ok(graph.tasks.len())
        })
    }

    /// Phase transition validator for an action name.
    ///
    /// Returns `Ok(None)` when no orchestration is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the action is not allowed now.
    pub fn check_action(&self, action: &str) -> Result<Option<ActionCheck>, Error> {
        let probe = self.probe();
        let checked = self
            .store
            .read(|graph| transition::check_action(graph, &self.config.actions, action, &probe))?;
        Ok(checked.transpose()?)
    }

    /// Validates and performs a phase transition; returns the previous phase.
    ///
    /// # Errors
    ///
    /// Returns a rejection, or [`Error::NoActiveOrchestration`].
    pub fn advance(&self, target: Phase, artifact: Option<PhaseArtifact>) -> Result<Phase, Error> {
        let probe = self.probe();
        self.mutate(|graph| {
            let previous = graph.current_phase;
            transition::advance_phase(graph, target, artifact, &self.config, &probe)?;
            Ok(previous)
        })
    }

    /// Records a skipped phase.
    ///
    /// # Errors
    ///
    /// Returns a rejection, or [`Error::NoActiveOrchestration`].
    pub fn skip(&self, phase: Phase) -> Result<(), Error> {
        self.mutate(|graph| Ok(transition::skip_phase(graph, phase)?))
    }

    /// Task admission validator; `Ok(None)` when no orchestration is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the task may not start.
    pub fn check_admission(&self, task_id: &str) -> Result<Option<Admission>, Error> {
        let checked = self.store.read(|graph| admission::check_admission(graph, task_id))?;
        Ok(checked.transpose()?)
    }

    /// Admits a task and marks it executing, binding it to `session` if given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the task may not start.
    pub fn admit(&self, task_id: &str, session: Option<&str>) -> Result<Option<Admission>, Error> {
        let admitted = self.store.with_lock(|graph| {
            let admission = admission::admit_task(graph, task_id)?;
            if let Some(session) = session {
                let path = self.sessions_path();
                let mut sessions = SessionTasks::load(self.ctx, &path);
                sessions.bind(session, task_id);
                sessions.save(self.ctx, &path)?;
            }
            Ok::<_, Error>(admission)
        })?;
        if let Some(admission) = admitted {
            tracing::info!(task = task_id, ?admission, "task admitted");
        }
        Ok(admitted)
    }

    /// Completion handler for a finished worker.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures.
    pub fn complete(&self, event: &CompletionEvent<'_>) -> Result<CompletionOutcome, Error> {
        let path = self.sessions_path();
        let outcome = self.store.with_lock(|graph| {
            let mut sessions = SessionTasks::load(self.ctx, &path);
            let task_id = completion::resolve_task_id(event, &sessions, self.ctx.task_ids.as_ref());
            let outcome = completion::handle_completion(
                graph,
                event.role,
                task_id.as_deref(),
                event.output,
                self.ctx.evidence.as_ref(),
            );
            if let Some(session) = event.session_id {
                if outcome != CompletionOutcome::Skipped && sessions.release(session).is_some() {
                    sessions.save(self.ctx, &path)?;
                }
            }
            Ok::<_, StoreError>(outcome)
        })?;
        Ok(outcome.unwrap_or(CompletionOutcome::NoActiveOrchestration))
    }

    /// Records a code review from reviewer output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for an unknown task, or
    /// [`Error::NoActiveOrchestration`].
    pub fn review(&self, task_id: &str, output: &str) -> Result<ReviewStatus, Error> {
        let findings = self.ctx.findings.review(output);
        self.mutate(|graph| {
            review::record_review(graph, task_id, findings)
                .ok_or_else(|| Error::Input(format!("task {task_id} is not in the task graph")))
        })
    }

    /// Records a spec-alignment run for `wave` (default: the current wave).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveOrchestration`] or a store error.
    pub fn spec_check(&self, wave: Option<u32>, output: &str) -> Result<SpecCheck, Error> {
        let findings = self.ctx.findings.spec_alignment(output);
        let now = self.ctx.clock.now();
        self.mutate(|graph| {
            let wave = wave.unwrap_or(graph.current_wave);
            Ok(review::record_spec_check(graph, wave, findings, now).clone())
        })
    }

    /// Wave gate aggregator for `wave` (default: the current wave).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveOrchestration`], a store error, or
    /// [`Error::Rejected`] for a wave that has not started. A failing gate is
    /// reported in the [`GateReport`], not as an error.
    pub fn gate(&self, wave: Option<u32>) -> Result<GateReport, Error> {
        let now = self.ctx.clock.now();
        self.mutate(|graph| Ok(gate::run_gate(graph, wave, now)?))
    }

    /// Hands failed tasks back for another attempt.
    ///
    /// Returns the IDs that were not failed or not found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveOrchestration`] or a store error.
    pub fn retry<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<String>, Error> {
        let mut skipped = Vec::new();
        let missing = self
            .store
            .update_tasks(ids, |task| {
                if task.status == TaskStatus::Failed {
                    task.status = TaskStatus::Pending;
                    task.failure_reason = None;
                    tracing::info!(task = %task.id, retry = task.retry_count, "task reset for retry");
                } else {
                    skipped.push(task.id.clone());
                }
            })?
            .ok_or(Error::NoActiveOrchestration)?;
        skipped.extend(missing);
        Ok(skipped)
    }

    /// Pre-action hook: phase validation, then task admission for worker
    /// invocations that name a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the action must be blocked.
    pub fn before_action(&self, event: &ActionEvent) -> Result<BeforeAction, Error> {
        let action = self.check_action(&event.action)?;
        if action.is_none() {
            return Ok(BeforeAction { action, admission: None });
        }
        let admission = match event.task_id(self.ctx) {
            Some(task) => self
                .admit(&task, event.session_id.as_deref())?
                .map(|admission| (task, admission)),
            None => None,
        };
        Ok(BeforeAction { action, admission })
    }

    /// Post-action hook: routes the finished action by worker role.
    ///
    /// # Errors
    ///
    /// Returns an error for infrastructure failures or a refused phase change.
    pub fn after_action(&self, event: &ActionEvent) -> Result<AfterAction, Error> {
        let output = event.output.as_deref().unwrap_or_default();
        let Some(role) = event.role.as_deref() else {
            if let ActionCheck::Enter(phase) =
                transition::classify_action(&self.config.actions, &event.action)
            {
                let artifact = event.arg("artifact").map(|a| PhaseArtifact::from(a.to_string()));
                return match self.advance(phase, artifact) {
                    Ok(_) => Ok(AfterAction::PhaseEntered(phase)),
                    Err(Error::NoActiveOrchestration) => Ok(AfterAction::NoActiveOrchestration),
                    Err(e) => Err(e),
                };
            }
            return Ok(AfterAction::Ignored);
        };

        let kind = self.config.roles.classify(role);
        let session = event.session_id.as_deref();
        let result = match kind {
            RoleKind::Review => {
                let sessions = SessionTasks::load(self.ctx, &self.sessions_path());
                let task = event
                    .task_id(self.ctx)
                    .or_else(|| session.and_then(|s| sessions.task_for(s)).map(str::to_string))
                    .or_else(|| self.ctx.task_ids.task_id(output));
                let Some(task) = task else {
                    tracing::warn!(role, "review finished without a task ID; nothing recorded");
                    return Ok(AfterAction::Ignored);
                };
                self.review(&task, output).map(|status| AfterAction::Reviewed { task, status })
            }
            RoleKind::SpecReview => self.spec_check(None, output).map(|check| {
                AfterAction::SpecChecked { wave: check.wave, critical: check.critical_count }
            }),
            RoleKind::Implementation | RoleKind::Other => {
                let task_id = event.task_id(self.ctx);
                let completion = CompletionEvent {
                    role: kind,
                    task_id: task_id.as_deref(),
                    session_id: session,
                    output,
                };
                self.complete(&completion).map(AfterAction::Completion)
            }
        };
        match result {
            Err(Error::NoActiveOrchestration) => Ok(AfterAction::NoActiveOrchestration),
            other => other,
        }
    }
}
