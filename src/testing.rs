//! In-memory fakes for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::adapters::live::markers::MarkerExtractor;
use crate::context::ServiceContext;
use crate::ports::{Clock, FileSystem, IdGenerator};

/// In-memory filesystem; clones share the same files.
#[derive(Clone, Default)]
pub struct MemFs {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    create_attempts: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl MemFs {
    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn put(&self, path: impl Into<PathBuf>, contents: &str) {
        self.files.lock().unwrap().insert(path.into(), contents.to_string());
    }

    pub fn create_attempts(&self) -> usize {
        self.create_attempts.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl FileSystem for MemFs {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.get(path).ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.put(path, contents);
        Ok(())
    }

    fn create_new(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Ok(false);
        }
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(true)
    }

    fn remove(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }
}

/// Clock frozen at a fixed instant that records sleeps instead of sleeping.
#[derive(Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl FixedClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            sleeps: Arc::default(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Sequential IDs: `id-1`, `id-2`, ...
#[derive(Default)]
pub struct SeqIds(AtomicUsize);

impl IdGenerator for SeqIds {
    fn generate_id(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Handles onto the fakes behind a test context.
pub struct Fakes {
    pub fs: MemFs,
    pub clock: FixedClock,
}

/// Builds a context over fresh fakes with marker-based extractors.
pub fn test_context() -> (ServiceContext, Fakes) {
    let fs = MemFs::default();
    let clock = FixedClock::default();
    let ctx = ServiceContext {
        clock: Box::new(clock.clone()),
        fs: Box::new(fs.clone()),
        id_gen: Box::new(SeqIds::default()),
        task_ids: Box::new(MarkerExtractor),
        evidence: Box::new(MarkerExtractor),
        findings: Box::new(MarkerExtractor),
    };
    (ctx, Fakes { fs, clock })
}
