//! Clock port for obtaining the current time.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Provides the current time and blocking waits.
///
/// Abstracting time access allows deterministic tests by substituting
/// a fixed clock, and lets lock polling be observed without sleeping.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
