//! Implementation of the phases of an archive run.
//!
//! ## Overview
//!
//! An archive run goes through 4 phases:
//! 1. Discovery - Register every git-dir a submodule commit may live in
//! 2. Walk - Enumerate the repositories pinned at the requested revision,
//!    depth-first and pre-order
//! 3. Launch - Start one `git archive` job per repository (bounded concurrency)
//! 4. Assembly - Drain the jobs in launch order and concatenate their segments
//!
//! Phases 2 and 3 are interleaved: the walk is lazy, so archive jobs for the
//! first repositories run while deeper submodules are still being resolved.
//! The launch order is the walk order, and the assembly order is the launch
//! order, whatever order the jobs actually finish in.

use std::path::PathBuf;

use crate::registry::StoreHandle;

// Phase modules
pub mod assemble;
pub mod discovery;
pub mod orchestrator;
pub mod walk;

// Re-export phase modules by number
pub use assemble as phase4;
pub use discovery as phase1;
pub use walk as phase2;

/// One repository to archive: produced once per reachable submodule, the
/// top repository included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryNode {
    /// Absolute working path: the top path, then `/<relative path>` per level.
    pub path: String,
    /// Git-dir holding `revision`.
    pub store: StoreHandle,
    pub revision: String,
}

impl RepositoryNode {
    pub fn new(path: impl Into<String>, store: StoreHandle, revision: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            store,
            revision: revision.into(),
        }
    }
}

/// Metadata attached to each archive job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Transient archive written by the job.
    pub output: PathBuf,
    /// Prefix of every path inside the segment.
    pub prefix: String,
}
