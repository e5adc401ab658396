//! `wavefront init` and `wavefront load-tasks` commands.

use std::path::Path;

use crate::context::ServiceContext;
use crate::orchestrator::{Orchestrator, TaskList};

fn read_task_list(ctx: &ServiceContext, root: &Path, file: &Path) -> Result<TaskList, String> {
    let path = root.join(file);
    let text = ctx
        .fs
        .read_to_string(&path)
        .map_err(|e| format!("failed to read task list {}: {e}", path.display()))?;
    TaskList::parse(&text).map_err(|e| e.to_string())
}

/// Execute the `init` command.
///
/// # Errors
///
/// Returns an error string if the task list is unreadable or invalid, or a
/// graph already exists and `force` is not set.
pub fn run(
    orch: &Orchestrator<'_>,
    ctx: &ServiceContext,
    root: &Path,
    title: Option<&str>,
    tasks: Option<&Path>,
    force: bool,
) -> Result<(), String> {
    let list = tasks.map(|file| read_task_list(ctx, root, file)).transpose()?;
    let title = title
        .map(str::to_string)
        .or_else(|| list.as_ref().and_then(|l| l.title().map(str::to_string)))
        .unwrap_or_default();
    let tasks = list.map(TaskList::into_tasks).unwrap_or_default();

    let graph = orch.init(&title, tasks, force).map_err(|e| e.to_string())?;
    println!(
        "Initialized orchestration{} with {} task(s) in {} wave(s). Phase: {}.",
        if title.is_empty() { String::new() } else { format!(" '{title}'") },
        graph.tasks.len(),
        graph.max_wave(),
        graph.current_phase,
    );
    Ok(())
}

/// Execute the `load-tasks` command.
///
/// # Errors
///
/// Returns an error string outside the decompose phase or for an invalid list.
pub fn load_tasks(
    orch: &Orchestrator<'_>,
    ctx: &ServiceContext,
    root: &Path,
    file: &Path,
) -> Result<(), String> {
    let list = read_task_list(ctx, root, file)?;
    let count = orch.load_tasks(list.into_tasks()).map_err(|e| e.to_string())?;
    println!("Loaded {count} task(s).");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::Phase;
    use crate::testing::test_context;

    const TASKS: &str = "title: auth\ntasks:\n  - id: T1\n    wave: 1\n  - id: T2\n    wave: 2\n    depends_on: [T1]\n";

    #[test]
    fn init_takes_title_from_task_list() {
        let (ctx, fakes) = test_context();
        fakes.fs.put("/repo/tasks.yaml", TASKS);
        let orch = Orchestrator::new(&ctx, Config::default(), Path::new("/repo"));

        run(&orch, &ctx, Path::new("/repo"), None, Some(Path::new("tasks.yaml")), false).unwrap();

        let graph = orch.status().unwrap().unwrap();
        assert_eq!(graph.title, "auth");
        assert_eq!(graph.tasks.len(), 2);
        assert!(run(&orch, &ctx, Path::new("/repo"), Some("again"), None, false).is_err());
    }

    #[test]
    fn invalid_task_list_is_reported() {
        let (ctx, fakes) = test_context();
        fakes.fs.put("/repo/tasks.json", r#"[{"id": "task-1", "wave": 1}]"#);
        let orch = Orchestrator::new(&ctx, Config::default(), Path::new("/repo"));

        let err = run(&orch, &ctx, Path::new("/repo"), None, Some(Path::new("tasks.json")), false)
            .unwrap_err();
        assert!(err.contains("task-1: ID must match T<digits>"));
    }

    #[test]
    fn load_tasks_during_decompose() {
        let (ctx, fakes) = test_context();
        fakes.fs.put("/repo/tasks.yaml", TASKS);
        let orch = Orchestrator::new(&ctx, Config::default(), Path::new("/repo"));
        orch.init("auth", Vec::new(), false).unwrap();
        assert!(load_tasks(&orch, &ctx, Path::new("/repo"), Path::new("tasks.yaml")).is_err());

        orch.store()
            .with_lock(|graph| {
                graph.current_phase = Phase::Decompose;
                Ok::<_, crate::error::StoreError>(())
            })
            .unwrap();
        load_tasks(&orch, &ctx, Path::new("/repo"), Path::new("tasks.yaml")).unwrap();
        assert_eq!(orch.store().tasks_in_wave(2).unwrap().len(), 1);
    }
}
