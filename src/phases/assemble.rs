//! Phase 4: Assembly
//!
//! Drains the archive jobs in launch order and builds the final archive from
//! their segments.
//!
//! ## Process
//!
//! 1.  **Stale output**: an existing file at the output path is removed
//!     before anything is appended to it.
//! 2.  **Ordered drain**: each job is waited for in launch order. A job that
//!     exited non-zero aborts the assembly.
//! 3.  **Concatenation**: the first segment is moved into place; every later
//!     one is appended with the [`SegmentConcatenator`] and then deleted.
//!     Segments are appended whole, never re-encoded, so every repository
//!     keeps its own embedded tar stream (and its own pax global header).
//!
//! ## Failure
//!
//! On failure the partially assembled output is removed, since a truncated
//! archive under the final name is easily mistaken for a complete one. The
//! segment files that were not consumed yet stay on disk for inspection.
//! The remaining jobs are still waited for.

use std::fs;
use std::io;
use std::path::Path;

use log::warn;

use super::Segment;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::output::Reporter;
use crate::process::{self, Capture, CommandSpec};
use crate::scheduler::JobScheduler;

/// Appends one complete archive segment onto the growing final archive.
pub trait SegmentConcatenator {
    fn append(&self, archive: &Path, segment: &Path) -> Result<()>;
}

/// Appends with `tar --concatenate`.
#[derive(Debug, Clone, Default)]
pub struct TarConcatenator {
    settings: Settings,
}

impl TarConcatenator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl SegmentConcatenator for TarConcatenator {
    fn append(&self, archive: &Path, segment: &Path) -> Result<()> {
        let spec = CommandSpec::new("tar")
            .arg("--concatenate")
            .arg("-f")
            .arg(archive)
            .arg(segment);
        process::run(
            &spec,
            Capture {
                stdout: false,
                stderr: true,
            },
            self.settings,
        )?
        .require_success(&spec)?;
        Ok(())
    }
}

/// Executes Phase 4 of the pipeline. Returns the number of segments assembled.
pub fn execute(
    jobs: &mut JobScheduler<Segment>,
    output: &Path,
    concatenator: &dyn SegmentConcatenator,
    reporter: &Reporter,
) -> Result<usize> {
    if let Err(e) = remove_if_exists(output) {
        jobs.drain();
        return Err(e);
    }

    let total = jobs.pending();
    let mut done = 0;
    while jobs.can_wait() {
        reporter.waiting(done + 1, total);
        if let Err(e) = append_next(jobs, output, concatenator, done == 0) {
            abandon(jobs, output);
            return Err(e);
        }
        done += 1;
    }
    Ok(done)
}

fn append_next(
    jobs: &mut JobScheduler<Segment>,
    output: &Path,
    concatenator: &dyn SegmentConcatenator,
    first: bool,
) -> Result<()> {
    let Some(job) = jobs.wait_next_in_order()? else {
        return Ok(());
    };
    if !job.status.success() {
        return Err(Error::ExternalProcess {
            command: job.spec.to_string(),
            code: job.status.code(),
            stderr: None,
        });
    }

    let segment = &job.metadata.output;
    if first {
        fs::rename(segment, output)?;
        return Ok(());
    }
    concatenator.append(output, segment)?;
    if let Err(e) = fs::remove_file(segment) {
        warn!(
            "unexpected error during cleanup of {:?}: {}",
            segment.display().to_string(),
            e
        );
    }
    Ok(())
}

/// Wait for the remaining jobs and drop the partial archive.
fn abandon(jobs: &mut JobScheduler<Segment>, output: &Path) {
    jobs.drain();
    if let Err(e) = remove_if_exists(output) {
        warn!(
            "could not remove partial archive {:?}: {}",
            output.display().to_string(),
            e
        );
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
