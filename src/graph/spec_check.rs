//! Latest spec-alignment result.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a spec-alignment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecVerdict {
    /// Implementation matches the specification.
    Passed,
    /// Divergences block the wave.
    Blocked,
    /// The run finished but its output could not be read.
    EvidenceCaptureFailed,
    /// No verdict stated.
    #[default]
    Unknown,
}

impl fmt::Display for SpecVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "PASSED",
            Self::Blocked => "BLOCKED",
            Self::EvidenceCaptureFailed => "EVIDENCE_CAPTURE_FAILED",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// The most recent spec-alignment result; each run overwrites the last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecCheck {
    /// Wave the check was run for.
    pub wave: u32,
    /// When the check ran.
    pub run_at: DateTime<Utc>,
    /// Number of critical findings.
    pub critical_count: usize,
    /// Number of high-severity findings.
    pub high_count: usize,
    /// Critical findings.
    #[serde(default)]
    pub critical_findings: Vec<String>,
    /// High-severity findings.
    #[serde(default)]
    pub high_findings: Vec<String>,
    /// Medium-severity findings.
    #[serde(default)]
    pub medium_findings: Vec<String>,
    /// Low-severity findings.
    #[serde(default)]
    pub low_findings: Vec<String>,
    /// Overall verdict.
    #[serde(default)]
    pub verdict: SpecVerdict,
}
