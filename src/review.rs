//! Review and spec-alignment recorders.
//!
//! Turn extracted findings into task review state and the graph's single
//! spec-alignment record, which the wave gate then consumes.

use chrono::{DateTime, Utc};

use crate::graph::{ReviewStatus, SpecCheck, TaskGraph};
use crate::ports::{ReviewFindings, ReviewVerdict, SpecFindings};

/// Resolves a review status from extracted findings.
///
/// Critical findings block regardless of the stated verdict. Without a
/// verdict, advisory-only output counts as a pass and empty output as a
/// capture failure.
#[must_use]
pub fn review_status(findings: &ReviewFindings) -> ReviewStatus {
    if !findings.critical.is_empty() {
        return ReviewStatus::Blocked;
    }
    match findings.verdict {
        Some(ReviewVerdict::Blocked) => ReviewStatus::Blocked,
        Some(ReviewVerdict::Passed) => ReviewStatus::Passed,
        None if !findings.advisory.is_empty() => ReviewStatus::Passed,
        None => ReviewStatus::EvidenceCaptureFailed,
    }
}

/// Records a review on a task, replacing any earlier review findings.
///
/// Returns the resolved status, or `None` when the task is not in the graph.
pub fn record_review(
    graph: &mut TaskGraph,
    task_id: &str,
    findings: ReviewFindings,
) -> Option<ReviewStatus> {
    let status = review_status(&findings);
    let task = graph.task_mut(task_id)?;
    task.review_status = Some(status);
    task.critical_findings = findings.critical;
    task.advisory_findings = findings.advisory;
    match status {
        ReviewStatus::EvidenceCaptureFailed => {
            tracing::warn!(task = task_id, "review output had no verdict or findings");
        }
        _ => tracing::info!(
            task = task_id,
            %status,
            critical = task.critical_findings.len(),
            advisory = task.advisory_findings.len(),
            "review recorded"
        ),
    }
    Some(status)
}

/// Replaces the graph's spec-alignment record with a new run.
pub fn record_spec_check(
    graph: &mut TaskGraph,
    wave: u32,
    findings: SpecFindings,
    now: DateTime<Utc>,
) -> &SpecCheck {
    let check = SpecCheck {
        wave,
        run_at: now,
        critical_count: findings.critical.len(),
        high_count: findings.high.len(),
        critical_findings: findings.critical,
        high_findings: findings.high,
        medium_findings: findings.medium,
        low_findings: findings.low,
        verdict: findings.verdict,
    };
    tracing::info!(
        wave,
        verdict = %check.verdict,
        critical = check.critical_count,
        high = check.high_count,
        "spec alignment recorded"
    );
    graph.spec_check.insert(check)
}
