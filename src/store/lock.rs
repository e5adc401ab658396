//! Advisory file lock guarding the task graph.
//!
//! The lock is a marker file created with exclusive-create semantics. A
//! holder that cannot create it polls at a fixed interval up to a bounded
//! number of attempts, then fails loudly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ServiceContext;
use crate::error::StoreError;

/// How hard to try for the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    /// Maximum number of create attempts.
    pub attempts: u32,
    /// Pause between attempts.
    pub retry_interval: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self { attempts: 50, retry_interval: Duration::from_millis(100) }
    }
}

/// Contents of the lock marker, for whoever finds a stale one.
#[derive(Debug, Serialize, Deserialize)]
struct LockMarker {
    owner: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// A held lock; released on drop.
pub struct FileLock<'a> {
    ctx: &'a ServiceContext,
    path: PathBuf,
    owner: String,
    held: bool,
}

impl<'a> FileLock<'a> {
    /// Acquires the lock at `path`, retrying per `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockExhausted`] when every attempt finds the
    /// marker present, or [`StoreError::Io`] when the marker cannot be created.
    pub fn acquire(
        ctx: &'a ServiceContext,
        path: &Path,
        policy: &LockPolicy,
    ) -> Result<Self, StoreError> {
        let owner = ctx.id_gen.generate_id();
        let marker = LockMarker {
            owner: owner.clone(),
            pid: std::process::id(),
            acquired_at: ctx.clock.now(),
        };
        let contents =
            serde_json::to_string(&marker).map_err(|e| StoreError::Serialize(e.to_string()))?;

        for attempt in 1..=policy.attempts {
            let created = ctx.fs.create_new(path, &contents).map_err(|e| StoreError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            if created {
                tracing::debug!(lock = %path.display(), %owner, attempt, "lock acquired");
                return Ok(Self { ctx, path: path.to_path_buf(), owner, held: true });
            }
            if attempt < policy.attempts {
                ctx.clock.sleep(policy.retry_interval);
            }
        }

        tracing::error!(lock = %path.display(), attempts = policy.attempts, "lock acquisition failed");
        Err(StoreError::LockExhausted { path: path.to_path_buf(), attempts: policy.attempts })
    }

    /// Releases the lock now instead of on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker exists but cannot be removed.
    pub fn release(mut self) -> Result<(), StoreError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), StoreError> {
        if !self.held {
            return Ok(());
        }
        self.held = false;
        self.ctx.fs.remove(&self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(lock = %self.path.display(), owner = %self.owner, "lock released");
        Ok(())
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            tracing::warn!("failed to release task graph lock: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FileSystem;
    use crate::testing::test_context;

    const LOCK: &str = "/state/task-graph.json.lock";

    #[test]
    fn acquire_writes_marker_and_drop_removes_it() {
        let (ctx, fakes) = test_context();
        {
            let _lock = FileLock::acquire(&ctx, Path::new(LOCK), &LockPolicy::default()).unwrap();
            let marker: LockMarker =
                serde_json::from_str(&fakes.fs.get(Path::new(LOCK)).unwrap()).unwrap();
            assert_eq!(marker.owner, "id-1");
        }
        assert!(fakes.fs.get(Path::new(LOCK)).is_none());
    }

    #[test]
    fn exhausts_after_bounded_attempts() {
        let (ctx, fakes) = test_context();
        fakes.fs.put(LOCK, "held elsewhere");

        let err = FileLock::acquire(&ctx, Path::new(LOCK), &LockPolicy::default())
            .err()
            .expect("lock must not be acquired");

        assert!(matches!(err, StoreError::LockExhausted { attempts: 50, .. }));
        assert_eq!(fakes.fs.create_attempts(), 50);
        assert_eq!(fakes.clock.sleeps().len(), 49);
        assert!(fakes.clock.sleeps().iter().all(|d| *d == Duration::from_millis(100)));
        assert_eq!(fakes.fs.get(Path::new(LOCK)).as_deref(), Some("held elsewhere"));
    }

    #[test]
    fn release_is_idempotent() {
        let (ctx, fakes) = test_context();
        let lock = FileLock::acquire(&ctx, Path::new(LOCK), &LockPolicy::default()).unwrap();
        fakes.fs.remove(Path::new(LOCK)).unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn second_holder_waits_for_release() {
        let (ctx, _fakes) = test_context();
        let policy = LockPolicy { attempts: 2, retry_interval: Duration::ZERO };
        let first = FileLock::acquire(&ctx, Path::new(LOCK), &policy).unwrap();
        assert!(FileLock::acquire(&ctx, Path::new(LOCK), &policy).is_err());
        first.release().unwrap();
        assert!(FileLock::acquire(&ctx, Path::new(LOCK), &policy).is_ok());
    }
}
