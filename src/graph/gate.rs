//! Per-wave gate record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Checkpoint between waves.
///
/// A missing record means the gate was never evaluated. Boolean fields
/// are unset until proven; unset resolves to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveGate {
    /// Every task in the wave is implemented or completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impl_complete: Option<bool>,
    /// Every task in the wave has passing test evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<bool>,
    /// The gate passed; the next wave may start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_complete: Option<bool>,
    /// The last evaluation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    /// Tasks lacking passing test evidence at the last failed evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_test_count: Option<usize>,
    /// Critical findings outstanding at the last failed evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_count: Option<usize>,
    /// When the gate was last evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl WaveGate {
    /// Returns `true` once the gate has passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.reviews_complete == Some(true)
    }

    /// Returns `true` if the last evaluation blocked the gate.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked == Some(true)
    }

    /// Returns `true` if every task of the wave has been implemented.
    #[must_use]
    pub fn impl_complete(&self) -> bool {
        self.impl_complete == Some(true)
    }
}
