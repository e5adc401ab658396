//! Task admission validator.
//!
//! A tracked task may start only when its wave has been reached, every
//! dependency is done, and the previous wave's gate has passed. Checks run
//! in that order and stop at the first violation.

use crate::error::Rejection;
use crate::graph::{TaskGraph, TaskStatus};

/// Result of a successful admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The task is in the graph and passed every check.
    Tracked,
    /// The task is not in the graph; admission control does not apply.
    Untracked,
}

/// Checks whether `task_id` may start.
///
/// # Errors
///
/// Returns [`Rejection::FutureWave`], [`Rejection::UnmetDependencies`] (listing
/// every unmet dependency), or one of the gate rejections.
pub fn check_admission(graph: &TaskGraph, task_id: &str) -> Result<Admission, Rejection> {
    let Some(task) = graph.task(task_id) else {
        tracing::debug!(task = task_id, "untracked task admitted");
        return Ok(Admission::Untracked);
    };

    let current_wave = graph.current_wave;
    if task.wave > current_wave {
        return Err(Rejection::FutureWave { task: task.id.clone(), wave: task.wave, current_wave });
    }

    let unmet = graph.unmet_dependencies(task);
    if !unmet.is_empty() {
        return Err(Rejection::UnmetDependencies { task: task.id.clone(), unmet });
    }

    if task.wave == current_wave && current_wave > 1 {
        let previous = current_wave - 1;
        let (task, wave) = (task.id.clone(), task.wave);
        match graph.gate(previous) {
            None => return Err(Rejection::GateNotRun { task, wave, previous }),
            Some(gate) if gate.passed() => {}
            Some(gate) if gate.is_blocked() => {
                return Err(Rejection::GateBlocked {
                    task,
                    wave,
                    previous,
                    failed_tests: gate.failed_test_count.unwrap_or(0),
                    critical: gate.critical_count.unwrap_or(0),
                });
            }
            Some(_) => return Err(Rejection::GateNotPassed { task, wave, previous }),
        }
    }

    Ok(Admission::Tracked)
}

/// Checks admission and marks the task as executing.
///
/// A failed task may be re-admitted; its `retry_count` is kept and its
/// failure reason cleared.
///
/// # Errors
///
/// Returns the rejection from [`check_admission`]; the graph is untouched.
pub fn admit_task(graph: &mut TaskGraph, task_id: &str) -> Result<Admission, Rejection> {
    let admission = check_admission(graph, task_id)?;
    if admission == Admission::Tracked {
        mark_task_executing(graph, task_id);
    }
    Ok(admission)
}

/// Marks a tracked task as in progress and adds it to the executing set.
///
/// Done tasks keep their status; re-running one only tracks the worker.
pub fn mark_task_executing(graph: &mut TaskGraph, task_id: &str) {
    let Some(task) = graph.task_mut(task_id) else {
        return;
    };
    if !task.is_done() {
        if task.status == TaskStatus::Failed {
            tracing::info!(task = task_id, retry = task.retry_count, "failed task re-admitted");
        }
        task.status = TaskStatus::InProgress;
        task.failure_reason = None;
    }
    graph.executing_tasks.insert(task_id.to_string());
}
