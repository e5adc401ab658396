//! Task entity and its status enums.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Pending,
    /// Assigned to a live worker.
    InProgress,
    /// Worker finished and recorded its outcome.
    Implemented,
    /// Passed its wave gate.
    Completed,
    /// Worker crashed or failed.
    Failed,
}

impl TaskStatus {
    /// Returns `true` for statuses that satisfy a dependency.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Implemented | Self::Completed)
    }

    /// Stable name used in the document and in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Implemented => "implemented",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting review.
    #[default]
    Pending,
    /// Reviewer signed off.
    Passed,
    /// Reviewer raised blocking findings.
    Blocked,
    /// The review ran but no verdict or findings could be read from it.
    EvidenceCaptureFailed,
}

impl ReviewStatus {
    /// Returns `true` if a review verdict was captured (passed or blocked).
    #[must_use]
    pub const fn is_reviewed(self) -> bool {
        matches!(self, Self::Passed | Self::Blocked)
    }

    /// Stable name used in the document and in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Blocked => "blocked",
            Self::EvidenceCaptureFailed => "evidence_capture_failed",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete unit of work scheduled in a wave.
///
/// Tri-state fields are `Option<bool>`: `None` means "not yet known".
/// Use the accessor methods for the resolved defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier of the form `T<digits>`.
    pub id: String,
    /// What the task should accomplish.
    #[serde(default)]
    pub description: String,
    /// Executor role assigned to the task.
    #[serde(default)]
    pub agent: String,
    /// Wave the task belongs to (1-based).
    pub wave: u32,
    /// Tasks that must be done before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Whether the worker's test run passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<bool>,
    /// Output excerpt proving the test run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_evidence: Option<String>,
    /// Whether the task must add new tests; unset means required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_tests_required: Option<bool>,
    /// Whether new tests were written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_tests_written: Option<bool>,
    /// Description of the new tests found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_test_evidence: Option<String>,
    /// Review verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<ReviewStatus>,
    /// Blocking review findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub critical_findings: Vec<String>,
    /// Non-blocking review findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisory_findings: Vec<String>,
    /// Paths touched by the task's worker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_modified: Vec<String>,
    /// Why the task failed, set on crash or failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Number of times the task was failed and handed back for retry.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retry_count: u32,
    /// Fields written by other tools, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Task {
    /// Creates a pending task in the given wave.
    #[must_use]
    pub fn new(id: impl Into<String>, wave: u32) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            agent: String::new(),
            wave,
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
            tests_passed: None,
            test_evidence: None,
            new_tests_required: None,
            new_tests_written: None,
            new_test_evidence: None,
            review_status: None,
            critical_findings: Vec::new(),
            advisory_findings: Vec::new(),
            files_modified: Vec::new(),
            failure_reason: None,
            retry_count: 0,
            extra: Map::new(),
        }
    }

    /// Builder-style helper setting `depends_on`.
    #[must_use]
    pub fn depending_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if the task satisfies dependents.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.status.is_done()
    }

    /// Resolved `new_tests_required`: unset means required.
    #[must_use]
    pub fn new_tests_required(&self) -> bool {
        self.new_tests_required.unwrap_or(true)
    }

    /// Returns `true` if the new-test requirement is satisfied.
    #[must_use]
    pub fn new_tests_satisfied(&self) -> bool {
        !self.new_tests_required() || self.new_tests_written == Some(true)
    }

    /// Returns `true` if a passing test run was recorded.
    #[must_use]
    pub fn tests_passed(&self) -> bool {
        self.tests_passed == Some(true)
    }

    /// Returns `true` if non-empty test evidence was recorded.
    #[must_use]
    pub fn has_test_evidence(&self) -> bool {
        self.test_evidence.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// Returns `true` if a review verdict (passed or blocked) was captured.
    #[must_use]
    pub fn is_reviewed(&self) -> bool {
        self.review_status.is_some_and(ReviewStatus::is_reviewed)
    }
}
