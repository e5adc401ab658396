//! Graph-construction checks.
//!
//! The scheduler assumes every dependency points at a task in a strictly
//! earlier wave. These checks enforce that when a task list is loaded.

use std::collections::{HashMap, HashSet};

use super::TaskGraph;

/// Returns `true` for identifiers of the form `T<digits>`.
#[must_use]
pub fn is_task_id(id: &str) -> bool {
    id.strip_prefix('T')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

impl TaskGraph {
    /// Checks task IDs, waves, and dependency edges.
    ///
    /// Returns every problem found, in task order; an empty list means the
    /// graph is well formed.
    #[must_use]
    pub fn validate_structure(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut waves: HashMap<&str, u32> = HashMap::new();
        let mut seen = HashSet::new();

        for task in &self.tasks {
            if !is_task_id(&task.id) {
                problems.push(format!("{}: ID must match T<digits>", task.id));
            }
            if !seen.insert(task.id.as_str()) {
                problems.push(format!("{}: duplicate task ID", task.id));
            }
            if task.wave == 0 {
                problems.push(format!("{}: wave must be 1 or greater", task.id));
            }
            waves.entry(task.id.as_str()).or_insert(task.wave);
        }

        for task in &self.tasks {
            for dep in &task.depends_on {
                if dep == &task.id {
                    problems.push(format!("{}: depends on itself", task.id));
                    continue;
                }
                match waves.get(dep.as_str()) {
                    None => problems.push(format!("{}: depends on unknown task {dep}", task.id)),
                    Some(&dep_wave) if dep_wave >= task.wave => problems.push(format!(
                        "{}: depends on {dep} in wave {dep_wave}, which is not earlier than wave {}",
                        task.id, task.wave
                    )),
                    Some(_) => {}
                }
            }
        }

        problems
    }
}
