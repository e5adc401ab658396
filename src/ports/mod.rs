//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the orchestration core and an
//! external system (time, filesystem, IDs, worker-output parsing).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod extract;
pub mod filesystem;
pub mod id_gen;

pub use clock::Clock;
pub use extract::{
    EvidenceExtractor, FindingExtractor, NewTestEvidence, ReviewFindings, ReviewVerdict,
    SpecFindings, TaskIdExtractor, TestEvidence,
};
pub use filesystem::FileSystem;
pub use id_gen::IdGenerator;
