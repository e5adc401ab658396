//! Task graph persistence and locking.
//!
//! The graph lives in one JSON document beneath the state directory, next
//! to its lock marker:
//!
//! ```text
//! <state_dir>/
//!   ├── task-graph.json
//!   └── task-graph.json.lock
//! ```
//!
//! All I/O goes through `ctx.fs`. Every read-modify-write happens inside a
//! single lock region; a `load` and a later `save` are only atomic together
//! when both run under [`GraphStore::with_lock`].

mod lock;

use std::path::{Path, PathBuf};

pub use lock::{FileLock, LockPolicy};

use crate::context::ServiceContext;
use crate::error::{Error, StoreError};
use crate::graph::{Phase, Task, TaskGraph, UnmetDependency, WaveGate};

/// File name of the task graph document.
pub const GRAPH_FILE: &str = "task-graph.json";

/// Persistence layer for the task graph.
pub struct GraphStore<'a> {
    ctx: &'a ServiceContext,
    path: PathBuf,
    lock_path: PathBuf,
    policy: LockPolicy,
}

impl<'a> GraphStore<'a> {
    /// Creates a store for the graph in `state_dir`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, state_dir: &Path, policy: LockPolicy) -> Self {
        let path = state_dir.join(GRAPH_FILE);
        let lock_path = state_dir.join(format!("{GRAPH_FILE}.lock"));
        Self { ctx, path, lock_path, policy }
    }

    /// Path of the graph document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock marker.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Acquires the graph lock.
    ///
    /// # Errors
    ///
    /// Returns an error when the lock cannot be acquired within the policy.
    pub fn lock(&self) -> Result<FileLock<'a>, StoreError> {
        FileLock::acquire(self.ctx, &self.lock_path, &self.policy)
    }

    /// Reads the graph from disk.
    ///
    /// A missing document and a corrupt one both yield `None`; corruption is
    /// logged, never raised. Call this while holding the lock.
    #[must_use]
    pub fn load(&self) -> Option<TaskGraph> {
        if !self.ctx.fs.exists(&self.path) {
            return None;
        }
        let contents = match self.ctx.fs.read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(graph = %self.path.display(), "failed to read task graph: {e}");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(graph) => Some(graph),
            Err(e) => {
                tracing::warn!(
                    graph = %self.path.display(),
                    "task graph is corrupt, treating as absent: {e}"
                );
                None
            }
        }
    }

    /// Writes the graph to disk as-is. Call this while holding the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, graph: &TaskGraph) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(graph)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.ctx.fs.write(&self.path, &format!("{json}\n")).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Runs a read-only query against the freshest graph under the lock.
    ///
    /// Returns `Ok(None)` when no graph exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn read<T>(&self, query: impl FnOnce(&TaskGraph) -> T) -> Result<Option<T>, StoreError> {
        let lock = self.lock()?;
        let result = self.load().map(|graph| query(&graph));
        lock.release()?;
        Ok(result)
    }

    /// Loads, mutates, and saves the graph in one lock region.
    ///
    /// Returns `Ok(None)` when no graph exists. The document is only written
    /// when `mutate` succeeds and actually changed something, in which case
    /// `updated_at` is stamped. The lock is released on every path.
    ///
    /// # Errors
    ///
    /// Returns the error from `mutate`, or a store error from locking/saving.
    pub fn with_lock<T, E>(
        &self,
        mutate: impl FnOnce(&mut TaskGraph) -> Result<T, E>,
    ) -> Result<Option<T>, E>
    where
        E: From<StoreError>,
    {
        let lock = self.lock()?;
        let Some(mut graph) = self.load() else {
            return Ok(None);
        };
        let before = graph.clone();
        let result = mutate(&mut graph)?;
        if graph != before {
            graph.updated_at = self.ctx.clock.now();
            self.save(&graph)?;
        }
        lock.release()?;
        Ok(Some(result))
    }

    /// Writes a brand-new graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] if a document already exists and `overwrite`
    /// is false, or a store error.
    pub fn create(&self, graph: &TaskGraph, overwrite: bool) -> Result<(), Error> {
        let lock = self.lock()?;
        if !overwrite && self.ctx.fs.exists(&self.path) {
            return Err(Error::Input(format!(
                "task graph already exists at {}; pass --force to replace it",
                self.path.display()
            )));
        }
        self.save(graph)?;
        lock.release()?;
        tracing::info!(graph = %self.path.display(), tasks = graph.tasks.len(), "task graph created");
        Ok(())
    }

    /// Applies `update` to each listed task in a single lock region.
    ///
    /// Returns the IDs that matched no task, or `Ok(None)` without a graph.
    ///
    /// # Errors
    ///
    /// Returns a store error from locking or saving.
    pub fn update_tasks<S: AsRef<str>>(
        &self,
        ids: &[S],
        mut update: impl FnMut(&mut Task),
    ) -> Result<Option<Vec<String>>, StoreError> {
        self.with_lock(|graph| {
            let mut missing = Vec::new();
            for id in ids {
                match graph.task_mut(id.as_ref()) {
                    Some(task) => update(task),
                    None => missing.push(id.as_ref().to_string()),
                }
            }
            Ok(missing)
        })
    }

    /// Current phase, or `None` without a graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn current_phase(&self) -> Result<Option<Phase>, StoreError> {
        self.read(|graph| graph.current_phase)
    }

    /// Current wave, or `None` without a graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn current_wave(&self) -> Result<Option<u32>, StoreError> {
        self.read(|graph| graph.current_wave)
    }

    /// Tasks of one wave; empty without a graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn tasks_in_wave(&self, wave: u32) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .read(|graph| graph.tasks_in_wave(wave).cloned().collect())
            .map(Option::unwrap_or_default)?)
    }

    /// Unmet dependencies of a task; `None` without a graph or task.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn unmet_dependencies(&self, id: &str) -> Result<Option<Vec<UnmetDependency>>, StoreError> {
        Ok(self
            .read(|graph| graph.task(id).map(|task| graph.unmet_dependencies(task)))?
            .flatten())
    }

    /// Whether every dependency of a task is done; `None` without a graph or task.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn dependencies_satisfied(&self, id: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.unmet_dependencies(id)?.map(|unmet| unmet.is_empty()))
    }

    /// Whether a task is assigned to a live worker; `false` without a graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn is_executing(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.read(|graph| graph.executing_tasks.contains(id))?.unwrap_or(false))
    }

    /// Gate record of a wave; `None` without a graph or record.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn gate(&self, wave: u32) -> Result<Option<WaveGate>, StoreError> {
        Ok(self.read(|graph| graph.gate(wave).cloned())?.flatten())
    }
}
