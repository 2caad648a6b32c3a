//! Orchestrator for the complete archive operation
//!
//! This module coordinates all phases to provide a single entry point for an
//! archive run, from resolving the requested revision to writing the final
//! archive.

use std::path::Path;

use super::{phase1, phase2, phase4, RepositoryNode, Segment};
use crate::config::{ArchiveFormat, ArchiveOptions};
use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::output::Reporter;
use crate::phases::assemble::SegmentConcatenator;
use crate::process::CommandSpec;
use crate::scheduler::JobScheduler;

/// What an archive run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of repositories archived (or that would be, on a dry run).
    pub repositories: usize,
    pub dry_run: bool,
}

/// Execute the complete archive operation
///
/// 1. Resolve the revision and discover candidate git-dirs
/// 2. Walk the submodules pinned at that revision
/// 3. Launch one `git archive` per repository as the walk produces them
/// 4. Concatenate the segments, in walk order, into `options.output`
///
/// A dry run stops after step 3 without launching anything and never touches
/// the output path. If the walk fails, the jobs already launched are waited
/// for, their segments are left on disk, and no output is written.
pub fn execute_archive<G: GitOperations + ?Sized>(
    options: &ArchiveOptions,
    git: &G,
    concatenator: &dyn SegmentConcatenator,
    reporter: &Reporter,
) -> Result<ArchiveSummary> {
    let top_rev = git.resolve_commit(&options.workdir, &options.revision)?;

    // Phase 1: Discovery
    let discovered = phase1::execute(git, &options.workdir, &options.lookups)?;
    let top = discovered.top.to_string_lossy().into_owned();
    let root = RepositoryNode::new(top.clone(), discovered.top_store.clone(), top_rev);

    // Phases 2 and 3: Walk and Launch
    let mut jobs = JobScheduler::new(options.jobs, options.settings);
    let mut total = 0;
    for node in phase2::walk(git, &discovered.registry, root, options.depth) {
        if let Err(e) = launch_node(options, &top, node, total, &mut jobs, reporter) {
            jobs.drain();
            return Err(e);
        }
        total += 1;
    }

    if options.dry_run {
        reporter.dry_run_done();
        return Ok(ArchiveSummary {
            repositories: total,
            dry_run: true,
        });
    }

    // Phase 4: Assembly
    let repositories = phase4::execute(&mut jobs, &options.output, concatenator, reporter)?;
    reporter.done();

    Ok(ArchiveSummary {
        repositories,
        dry_run: false,
    })
}

fn launch_node(
    options: &ArchiveOptions,
    top: &str,
    node: Result<RepositoryNode>,
    index: usize,
    jobs: &mut JobScheduler<Segment>,
    reporter: &Reporter,
) -> Result<()> {
    let node = node?;
    let prefix = archive_prefix(&options.prefix, top, &node.path)?;
    // Named by position, not revision: the same commit may be pinned at two paths
    let segment = options.segment_path(index);
    reporter.job(index, &prefix, &node, &segment, options.dry_run);
    if !options.dry_run {
        let spec = archive_command(&node, options.format, &segment, &prefix);
        jobs.launch(spec, Segment { output: segment, prefix })?;
    }
    Ok(())
}

/// Prefix of the files of the repository at `path` inside the final archive:
/// the user prefix followed by the path relative to the top, with a trailing
/// slash. The top repository gets the user prefix alone.
pub fn archive_prefix(user_prefix: &str, top: &str, path: &str) -> Result<String> {
    let top_slash = format!("{}/", top);
    let path_slash = format!("{}/", path);
    let relative = path_slash
        .strip_prefix(&top_slash)
        .ok_or_else(|| Error::InvariantViolation {
            message: format!("path {:?} not under top {:?}", path_slash, top_slash),
        })?;
    Ok(format!("{}{}", user_prefix, relative))
}

/// The `git archive` invocation producing one segment.
pub fn archive_command(
    node: &RepositoryNode,
    format: ArchiveFormat,
    segment: &Path,
    prefix: &str,
) -> CommandSpec {
    CommandSpec::new("git")
        .arg("--git-dir")
        .arg(node.store.path())
        .arg("archive")
        .arg("--format")
        .arg(format.as_str())
        .arg("--output")
        .arg(segment)
        .arg("--prefix")
        .arg(prefix)
        .arg(&node.revision)
}
