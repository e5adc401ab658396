//! `wavefront gate` command.

use crate::orchestrator::Orchestrator;

/// Execute the `gate` command.
///
/// The report is printed either way; a failing gate returns an error so the
/// process exits non-zero.
///
/// # Errors
///
/// Returns an error string when the gate fails or no orchestration exists.
pub fn run(orch: &Orchestrator<'_>, wave: Option<u32>, json: bool) -> Result<(), String> {
    let report = orch.gate(wave).map_err(|e| e.to_string())?;
    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!("{}", report.render());
    }
    if report.passed {
        Ok(())
    } else {
        Err(format!("wave {} gate blocked", report.wave))
    }
}
