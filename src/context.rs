//! Service context bundling all port trait objects.

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::live::markers::MarkerExtractor;
use crate::ports::{
    Clock, EvidenceExtractor, FileSystem, FindingExtractor, IdGenerator, TaskIdExtractor,
};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. The core only ever
/// reaches the outside world through these.
pub struct ServiceContext {
    /// Clock for timestamps and lock polling.
    pub clock: Box<dyn Clock>,
    /// Filesystem for the task graph, lock marker, and artifact checks.
    pub fs: Box<dyn FileSystem>,
    /// ID generator for lock-owner tokens.
    pub id_gen: Box<dyn IdGenerator>,
    /// Resolves task IDs from worker output.
    pub task_ids: Box<dyn TaskIdExtractor>,
    /// Extracts test evidence and touched files from worker output.
    pub evidence: Box<dyn EvidenceExtractor>,
    /// Extracts review and spec-alignment findings.
    pub findings: Box<dyn FindingExtractor>,
}

impl ServiceContext {
    /// Creates a live context with real adapters and marker-based extractors.
    #[must_use]
    pub fn live() -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            id_gen: Box::new(LiveIdGenerator),
            task_ids: Box::new(MarkerExtractor),
            evidence: Box::new(MarkerExtractor),
            findings: Box::new(MarkerExtractor),
        }
    }
}
