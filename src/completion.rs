//! Task completion handler and crash detection.
//!
//! Runs after a worker finishes. Resolves which task the worker was on,
//! records its outcome, and fails every executing task when an
//! implementation worker cannot be tied to one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::RoleKind;
use crate::context::ServiceContext;
use crate::error::StoreError;
use crate::graph::{TaskGraph, TaskStatus};
use crate::ports::{EvidenceExtractor, TaskIdExtractor};

/// Failure reason recorded on tasks failed by crash detection.
pub const CRASH_REASON: &str = "agent_crash: no task ID in output";

/// Session ID to task ID bindings made at admission time.
///
/// Persisted between processes as a small JSON map next to the task graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionTasks(BTreeMap<String, String>);

impl SessionTasks {
    /// Binds a session to the task it is working on.
    pub fn bind(&mut self, session: impl Into<String>, task: impl Into<String>) {
        self.0.insert(session.into(), task.into());
    }

    /// Returns the task bound to a session.
    #[must_use]
    pub fn task_for(&self, session: &str) -> Option<&str> {
        self.0.get(session).map(String::as_str)
    }

    /// Removes a session's binding, returning its task.
    pub fn release(&mut self, session: &str) -> Option<String> {
        self.0.remove(session)
    }

    /// Reads bindings from `path`; a missing or unreadable file yields none.
    #[must_use]
    pub fn load(ctx: &ServiceContext, path: &Path) -> Self {
        if !ctx.fs.exists(path) {
            return Self::default();
        }
        ctx.fs
            .read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_else(|| {
                tracing::warn!(sessions = %path.display(), "session bindings unreadable, starting empty");
                Self::default()
            })
    }

    /// Writes bindings to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, ctx: &ServiceContext, path: &Path) -> Result<(), StoreError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialize(e.to_string()))?;
        ctx.fs.write(path, &format!("{json}\n")).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// A finished worker invocation.
#[derive(Debug, Clone, Copy)]
pub struct CompletionEvent<'a> {
    /// Role of the worker that finished.
    pub role: RoleKind,
    /// Task ID carried by the invocation, if any.
    pub task_id: Option<&'a str>,
    /// Session the worker ran in, if known.
    pub session_id: Option<&'a str>,
    /// Raw worker output.
    pub output: &'a str,
}

/// What the completion handler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Review workers never change implementation status.
    Skipped,
    /// No task graph exists.
    NoActiveOrchestration,
    /// No task could be resolved for a non-implementation worker.
    NoTaskResolved,
    /// An implementation worker finished without naming a task.
    CrashDetected {
        /// Tasks marked failed.
        failed: Vec<String>,
    },
    /// The resolved task is not in the graph.
    Untracked {
        /// Resolved task ID.
        task: String,
    },
    /// The task already had its outcome recorded; nothing changed.
    AlreadyRecorded {
        /// Task ID.
        task: String,
    },
    /// The task's outcome was recorded.
    Recorded(TaskCompletion),
}

/// Details of a recorded completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    /// Task ID.
    pub task: String,
    /// Test result read from the output; `None` when no run was found.
    pub tests_passed: Option<bool>,
    /// Number of new tests found, if any.
    pub new_tests: Option<usize>,
    /// Files the worker reported touching.
    pub files_modified: usize,
    /// Set when this completion finished the current wave.
    pub wave_ready: Option<u32>,
}

/// Resolves the task a finished worker was on.
///
/// Tries the invocation's own task ID, then the session binding, then the
/// worker output.
#[must_use]
pub fn resolve_task_id(
    event: &CompletionEvent<'_>,
    sessions: &SessionTasks,
    extractor: &dyn TaskIdExtractor,
) -> Option<String> {
    event
        .task_id
        .map(str::to_string)
        .or_else(|| event.session_id.and_then(|s| sessions.task_for(s)).map(str::to_string))
        .or_else(|| extractor.task_id(event.output))
}

/// Applies a completion to the graph.
///
/// `task_id` is the already-resolved task (see [`resolve_task_id`]).
#[must_use]
pub fn handle_completion(
    graph: &mut TaskGraph,
    role: RoleKind,
    task_id: Option<&str>,
    output: &str,
    evidence: &dyn EvidenceExtractor,
) -> CompletionOutcome {
    if matches!(role, RoleKind::Review | RoleKind::SpecReview) {
        return CompletionOutcome::Skipped;
    }

    let Some(task_id) = task_id else {
        if role == RoleKind::Implementation {
            return CompletionOutcome::CrashDetected { failed: fail_executing(graph) };
        }
        return CompletionOutcome::NoTaskResolved;
    };

    let current_wave = graph.current_wave;
    let Some(task) = graph.task_mut(task_id) else {
        graph.executing_tasks.remove(task_id);
        return CompletionOutcome::Untracked { task: task_id.to_string() };
    };

    if task.status == TaskStatus::Completed
        || (task.status == TaskStatus::Implemented && task.has_test_evidence())
    {
        tracing::debug!(task = task_id, "completion already recorded, ignoring");
        return CompletionOutcome::AlreadyRecorded { task: task_id.to_string() };
    }

    let tests = evidence.test_evidence(output);
    if let Some(tests) = &tests {
        task.tests_passed = Some(tests.passed);
        task.test_evidence = Some(tests.summary.clone());
    }
    let new_tests = evidence.new_tests(output).filter(|n| n.total() > 0);
    if let Some(new_tests) = &new_tests {
        task.new_tests_written = Some(true);
        task.new_test_evidence = Some(new_tests.describe());
    }
    for file in evidence.files_modified(output) {
        if !task.files_modified.contains(&file) {
            task.files_modified.push(file);
        }
    }
    task.status = TaskStatus::Implemented;
    task.failure_reason = None;

    let completion = TaskCompletion {
        task: task_id.to_string(),
        tests_passed: task.tests_passed,
        new_tests: new_tests.as_ref().map(|n| n.total()),
        files_modified: task.files_modified.len(),
        wave_ready: None,
    };
    graph.executing_tasks.remove(task_id);
    tracing::info!(
        task = task_id,
        tests_passed = ?completion.tests_passed,
        files = completion.files_modified,
        "task implemented"
    );

    let wave_ready = graph.wave_implemented(current_wave).then(|| {
        graph.gate_mut(current_wave).impl_complete = Some(true);
        tracing::info!(wave = current_wave, "wave implemented, ready for gate");
        current_wave
    });
    CompletionOutcome::Recorded(TaskCompletion { wave_ready, ..completion })
}

fn fail_executing(graph: &mut TaskGraph) -> Vec<String> {
    let executing = std::mem::take(&mut graph.executing_tasks);
    let mut failed = Vec::with_capacity(executing.len());
    for id in executing {
        if let Some(task) = graph.task_mut(&id) {
            task.status = TaskStatus::Failed;
            task.failure_reason = Some(CRASH_REASON.to_string());
            task.retry_count += 1;
        }
        failed.push(id);
    }
    if !failed.is_empty() {
        tracing::warn!(tasks = ?failed, "implementation worker finished without a task ID, marking executing tasks failed");
    }
    failed
}
