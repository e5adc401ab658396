//! `wavefront status` command.

use crate::graph::{Task, TaskGraph};
use crate::orchestrator::Orchestrator;

/// Execute the `status` command.
///
/// Displays the phase, the current wave, a table of all tasks, and which
/// tasks are executing.
///
/// # Errors
///
/// Returns an error string if the graph cannot be read.
pub fn run(orch: &Orchestrator<'_>, json: bool) -> Result<(), String> {
    let Some(graph) = orch.status().map_err(|e| e.to_string())? else {
        println!("No active orchestration.");
        return Ok(());
    };
    if json {
        let text = serde_json::to_string_pretty(&graph).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!("{}", render(&graph));
    }
    Ok(())
}

fn tests_cell(task: &Task) -> &'static str {
    match task.tests_passed {
        Some(true) => "pass",
        Some(false) => "fail",
        None => "-",
    }
}

/// Renders the status report.
fn render(graph: &TaskGraph) -> String {
    let mut out = Vec::new();
    if !graph.title.is_empty() {
        out.push(format!("Title: {}", graph.title));
    }
    let skipped: Vec<&str> = graph.skipped_phases.iter().map(|p| p.as_str()).collect();
    if skipped.is_empty() {
        out.push(format!("Phase: {}", graph.current_phase));
    } else {
        out.push(format!("Phase: {} (skipped: {})", graph.current_phase, skipped.join(", ")));
    }
    for (phase, artifact) in &graph.phase_artifacts {
        out.push(format!("  {phase}: {artifact}"));
    }

    if graph.tasks.is_empty() {
        out.push("No tasks loaded.".to_string());
        return out.join("\n");
    }
    out.push(format!("Wave: {} of {}", graph.current_wave, graph.max_wave()));

    // Collect rows for column-width calculation.
    let rows: Vec<[String; 5]> = graph
        .tasks
        .iter()
        .map(|t| {
            [
                t.id.clone(),
                t.wave.to_string(),
                t.status.to_string(),
                tests_cell(t).to_string(),
                t.review_status.map_or_else(|| "-".to_string(), |r| r.to_string()),
            ]
        })
        .collect();
    let headers = ["ID", "WAVE", "STATUS", "TESTS", "REVIEW"];
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| rows.iter().map(|r| r[i].len()).chain([headers[i].len()]).max().unwrap_or(0))
        .collect();
    let line = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    out.push(String::new());
    out.push(line(headers));
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in &rows {
        out.push(line(row.each_ref().map(String::as_str)));
    }

    out.push(String::new());
    for (wave, gate) in &graph.wave_gates {
        let state = if gate.passed() {
            "passed"
        } else if gate.is_blocked() {
            "blocked"
        } else if gate.impl_complete() {
            "ready"
        } else {
            "open"
        };
        out.push(format!("Wave {wave} gate: {state}"));
    }
    if graph.executing_tasks.is_empty() {
        out.push("Executing: none".to_string());
    } else {
        let executing: Vec<&str> = graph.executing_tasks.iter().map(String::as_str).collect();
        out.push(format!("Executing: {}", executing.join(", ")));
    }
    out.join("\n")
}
