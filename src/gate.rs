//! Wave gate aggregator.
//!
//! Evaluates a wave in five short-circuiting stages:
//!
//! 1. every task has passing test evidence
//! 2. every task that needs new tests has written them
//! 3. every task has a review verdict
//! 4. the latest spec-alignment check has no critical findings
//! 5. no task carries critical review findings
//!
//! The evaluation is pure and always yields a [`GateReport`]; failing a stage
//! is an expected outcome, not an error. [`apply`] writes the result back.
//! Only waves that have started may be gated.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Rejection;
use crate::graph::{ReviewStatus, TaskGraph, TaskStatus, WaveGate};

/// Outcome of a single gate stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage passed.
    Passed,
    /// The stage failed; later stages did not run.
    Failed,
    /// An earlier stage failed.
    #[default]
    NotRun,
}

impl StageStatus {
    /// Returns `true` for [`StageStatus::Passed`].
    #[must_use]
    pub const fn passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::NotRun => "-",
        }
    }
}

/// Per-stage results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateChecks {
    /// Stage 1.
    pub tests_passed: StageStatus,
    /// Stage 2.
    pub new_tests_written: StageStatus,
    /// Stage 3.
    pub reviews_complete: StageStatus,
    /// Stage 4.
    pub spec_alignment: StageStatus,
    /// Stage 5.
    pub no_critical_findings: StageStatus,
}

impl GateChecks {
    /// Stages in evaluation order with their display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, StageStatus); 5] {
        [
            ("test evidence", self.tests_passed),
            ("new tests", self.new_tests_written),
            ("reviews complete", self.reviews_complete),
            ("spec alignment", self.spec_alignment),
            ("no critical findings", self.no_critical_findings),
        ]
    }
}

/// Tasks responsible for a failed stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTasks {
    /// Tasks without passing test evidence.
    pub missing_test_evidence: Vec<String>,
    /// Tasks that still owe new tests.
    pub missing_new_tests: Vec<String>,
    /// Tasks without a review verdict.
    pub unreviewed: Vec<String>,
    /// Tasks with critical findings and how many each has.
    pub critical_findings: Vec<(String, usize)>,
    /// Critical findings from the spec-alignment check.
    pub spec_critical: usize,
}

/// Full result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    /// Wave evaluated.
    pub wave: u32,
    /// Whether every stage passed.
    pub passed: bool,
    /// Per-stage results.
    pub checks: GateChecks,
    /// Tasks behind the first failing stage.
    pub failed_tasks: FailedTasks,
    /// Non-blocking observations.
    pub warnings: Vec<String>,
    /// Wave that became current, when the gate advanced the workflow.
    pub next_wave: Option<u32>,
    /// The evaluated wave was the last one.
    pub all_waves_complete: bool,
}

impl GateReport {
    fn new(wave: u32) -> Self {
        Self {
            wave,
            passed: false,
            checks: GateChecks::default(),
            failed_tasks: FailedTasks::default(),
            warnings: Vec::new(),
            next_wave: None,
            all_waves_complete: false,
        }
    }

    /// Renders the report as plain text, one stage per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![format!("Wave {} gate", self.wave)];
        for (name, status) in self.checks.stages() {
            lines.push(format!("  [{:<4}] {name}", status.label()));
        }
        let failed = &self.failed_tasks;
        if !failed.missing_test_evidence.is_empty() {
            lines.push(format!("  missing test evidence: {}", failed.missing_test_evidence.join(", ")));
        }
        if !failed.missing_new_tests.is_empty() {
            lines.push(format!("  missing new tests: {}", failed.missing_new_tests.join(", ")));
        }
        if !failed.unreviewed.is_empty() {
            lines.push(format!("  unreviewed: {}", failed.unreviewed.join(", ")));
        }
        if failed.spec_critical > 0 {
            lines.push(format!("  spec alignment critical findings: {}", failed.spec_critical));
        }
        for (task, count) in &failed.critical_findings {
            lines.push(format!("  {task}: {count} critical finding(s)"));
        }
        for warning in &self.warnings {
            lines.push(format!("  warning: {warning}"));
        }
        lines.push(match (self.passed, self.next_wave) {
            (true, Some(next)) => format!("PASSED. Wave {next} may start."),
            (true, None) => "PASSED. All waves complete.".to_string(),
            (false, _) => format!("BLOCKED. Next: fix the failures above and re-run the gate for wave {}.", self.wave),
        });
        lines.join("\n")
    }
}

/// Evaluates the gate for `wave` without changing the graph.
#[must_use]
pub fn evaluate(graph: &TaskGraph, wave: u32) -> GateReport {
    let mut report = GateReport::new(wave);
    let tasks: Vec<_> = graph.tasks_in_wave(wave).collect();
    if tasks.is_empty() {
        report.warnings.push(format!("wave {wave} has no tasks"));
        return report;
    }

    let failing = |pred: &dyn Fn(&crate::graph::Task) -> bool| -> Vec<String> {
        tasks.iter().filter(|t| !pred(t)).map(|t| t.id.clone()).collect()
    };

    report.failed_tasks.missing_test_evidence = failing(&|t| t.tests_passed());
    if !stage(&mut report.checks.tests_passed, &report.failed_tasks.missing_test_evidence) {
        return report;
    }

    report.failed_tasks.missing_new_tests = failing(&|t| t.new_tests_satisfied());
    if !stage(&mut report.checks.new_tests_written, &report.failed_tasks.missing_new_tests) {
        return report;
    }

    report.failed_tasks.unreviewed = failing(&|t| t.is_reviewed());
    if !stage(&mut report.checks.reviews_complete, &report.failed_tasks.unreviewed) {
        return report;
    }

    report.checks.spec_alignment = match &graph.spec_check {
        Some(check) => {
            if check.wave != wave {
                report.warnings.push(format!(
                    "spec alignment check was run for wave {}, not wave {wave}",
                    check.wave
                ));
            }
            if check.critical_count > 0 {
                report.failed_tasks.spec_critical = check.critical_count;
                StageStatus::Failed
            } else {
                StageStatus::Passed
            }
        }
        None => StageStatus::Passed,
    };
    if !report.checks.spec_alignment.passed() {
        return report;
    }

    report.failed_tasks.critical_findings = tasks
        .iter()
        .filter(|t| !t.critical_findings.is_empty())
        .map(|t| (t.id.clone(), t.critical_findings.len()))
        .collect();
    if !stage(&mut report.checks.no_critical_findings, &report.failed_tasks.critical_findings) {
        return report;
    }

    report.passed = true;
    report
}

fn stage<T>(status: &mut StageStatus, failures: &[T]) -> bool {
    *status = if failures.is_empty() { StageStatus::Passed } else { StageStatus::Failed };
    status.passed()
}

/// Writes an evaluation back to the graph.
///
/// On success every task of the wave is completed, the gate records the
/// pass, and the next wave (if any) becomes current with a fresh gate. On
/// failure the gate records why it is blocked, unless it already passed.
pub fn apply(graph: &mut TaskGraph, report: &mut GateReport, now: DateTime<Utc>) {
    let wave = report.wave;
    if !report.passed {
        let gate = graph.gate_mut(wave);
        if gate.passed() {
            tracing::warn!(wave, "gate re-evaluation failed after it had passed; keeping the pass");
            return;
        }
        gate.blocked = Some(true);
        gate.failed_test_count = Some(report.failed_tasks.missing_test_evidence.len());
        gate.critical_count = Some(
            report.failed_tasks.critical_findings.iter().map(|(_, n)| n).sum::<usize>()
                + report.failed_tasks.spec_critical,
        );
        gate.checked_at = Some(now);
        tracing::info!(wave, checks = ?report.checks, "wave gate blocked");
        return;
    }

    for task in graph.tasks.iter_mut().filter(|t| t.wave == wave) {
        task.status = TaskStatus::Completed;
        task.review_status = Some(ReviewStatus::Passed);
    }
    *graph.gate_mut(wave) = WaveGate {
        impl_complete: Some(true),
        tests_passed: Some(true),
        reviews_complete: Some(true),
        blocked: Some(false),
        failed_test_count: None,
        critical_count: None,
        checked_at: Some(now),
    };

    let next = wave + 1;
    if next <= graph.max_wave() {
        if !graph.gate(next).is_some_and(WaveGate::passed) {
            graph.wave_gates.insert(next, WaveGate::default());
        }
        graph.current_wave = graph.current_wave.max(next);
        report.next_wave = Some(next);
        tracing::info!(wave, next, "wave gate passed, next wave unblocked");
    } else {
        report.all_waves_complete = true;
        tracing::info!(wave, "wave gate passed, all waves complete");
    }
}

/// Evaluates and applies the gate for `wave` (default: the current wave).
///
/// # Errors
///
/// Returns [`Rejection::WaveNotStarted`] for a wave beyond the current one,
/// whose predecessors have not passed their gates.
pub fn run_gate(
    graph: &mut TaskGraph,
    wave: Option<u32>,
    now: DateTime<Utc>,
) -> Result<GateReport, Rejection> {
    let current_wave = graph.current_wave;
    let wave = wave.unwrap_or(current_wave);
    if wave > current_wave {
        return Err(Rejection::WaveNotStarted { wave, current_wave });
    }
    let mut report = evaluate(graph, wave);
    apply(graph, &mut report, now);
    Ok(report)
}
