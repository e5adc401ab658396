//! Extraction ports for free-form worker output.
//!
//! Workers report back as unstructured text. The core never parses that
//! text itself; it asks these extractors for structured signals and treats
//! "nothing found" as "no additional signal".

use std::collections::BTreeMap;

use crate::graph::SpecVerdict;

/// Structured test-run evidence found in worker output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEvidence {
    /// The test framework or runner that produced the evidence (e.g. `"cargo"`).
    pub framework: String,
    /// Whether the run passed.
    pub passed: bool,
    /// Number of passing tests, when the runner reports it.
    pub count: Option<u32>,
    /// The output line(s) the evidence was taken from.
    pub summary: String,
}

/// Newly written test methods, counted per language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTestEvidence {
    /// Number of added test declarations keyed by language name.
    pub counts: BTreeMap<String, usize>,
}

impl NewTestEvidence {
    /// Returns the total number of new tests across languages.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Formats the counts as `"python: 1, rust: 3"`.
    #[must_use]
    pub fn describe(&self) -> String {
        self.counts
            .iter()
            .map(|(lang, count)| format!("{lang}: {count}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Explicit verdict stated by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// The reviewer signed off.
    Passed,
    /// The reviewer blocked the change.
    Blocked,
}

/// Findings extracted from a code review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFindings {
    /// The stated verdict, if any was found.
    pub verdict: Option<ReviewVerdict>,
    /// Findings that block the wave gate.
    pub critical: Vec<String>,
    /// Findings that are reported but do not block.
    pub advisory: Vec<String>,
}

/// Findings extracted from a spec-alignment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFindings {
    /// Overall verdict.
    pub verdict: SpecVerdict,
    /// Critical-severity findings.
    pub critical: Vec<String>,
    /// High-severity findings.
    pub high: Vec<String>,
    /// Medium-severity findings.
    pub medium: Vec<String>,
    /// Low-severity findings.
    pub low: Vec<String>,
}

/// Resolves a task identifier from free text.
pub trait TaskIdExtractor: Send + Sync {
    /// Returns the task ID the text refers to, if one can be found.
    fn task_id(&self, text: &str) -> Option<String>;
}

/// Extracts test evidence and touched files from worker output.
pub trait EvidenceExtractor: Send + Sync {
    /// Returns test-run evidence, or `None` when the output shows no test run.
    fn test_evidence(&self, text: &str) -> Option<TestEvidence>;

    /// Counts newly added test declarations in diff-style text.
    fn new_tests(&self, text: &str) -> Option<NewTestEvidence>;

    /// Lists files the worker reports having modified.
    fn files_modified(&self, text: &str) -> Vec<String>;
}

/// Extracts verdicts and severity-tagged findings.
pub trait FindingExtractor: Send + Sync {
    /// Extracts a code-review verdict and critical/advisory findings.
    fn review(&self, text: &str) -> ReviewFindings;

    /// Extracts a spec-alignment verdict and findings by severity.
    fn spec_alignment(&self, text: &str) -> SpecFindings;
}
