//! Archive command implementation
//!
//! Resolves the command line into [`ArchiveOptions`] and runs the archive
//! pipeline:
//! 1. Discovery of the git-dirs submodule commits may live in
//! 2. Walk of the submodules pinned at the requested revision
//! 3. Launch of one `git archive` job per repository
//! 4. Assembly of the segments into the output file

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use git_archive_recursive::config::{ArchiveFormat, ArchiveOptions, DepthLimit, JobLimit, Settings};

/// Arguments for the archive command
#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Revision to archive
    #[arg(value_name = "TREE-ISH")]
    pub tree_ish: Option<String>,

    /// Write the archive to this file
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Archive format (inferred from the output name when omitted; only tar is supported)
    #[arg(long, value_name = "FMT")]
    pub format: Option<String>,

    /// Prepend this prefix to every path in the archive (should end with /)
    #[arg(short, long, value_name = "PREFIX/", default_value = "")]
    pub prefix: String,

    /// Number of archive jobs running at once, 0 for unlimited
    #[arg(
        short,
        long = "jobs",
        value_name = "N",
        default_value_t = JobLimit::default_parallelism(),
        allow_negative_numbers = true,
        env = "GIT_ARCHIVE_RECURSIVE_JOBS"
    )]
    pub jobs: i64,

    /// Also search this git-dir for submodule commits (repeatable)
    #[arg(long, value_name = "GIT-DIR", env = "GIT_ARCHIVE_RECURSIVE_LOOKUP")]
    pub lookup: Vec<PathBuf>,

    /// Maximum submodule depth, -1 for unlimited, 0 for the top repository only
    #[arg(short, long, value_name = "DEPTH", default_value_t = -1, allow_negative_numbers = true)]
    pub depth: i64,

    /// Show what would be archived without running git archive
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print every git and tar command before running it
    #[arg(long)]
    pub debug: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl ArchiveArgs {
    /// Resolve the arguments, validating the format before anything touches git.
    pub fn to_options(&self, workdir: &Path) -> Result<ArchiveOptions> {
        let format = ArchiveFormat::resolve(self.format.as_deref(), &self.output)?;

        let mut options = ArchiveOptions::new(&self.output, workdir);
        if let Some(rev) = &self.tree_ish {
            options.revision = rev.clone();
        }
        options.format = format;
        options.prefix = self.prefix.clone();
        options.jobs = JobLimit::from_arg(self.jobs);
        options.lookups = self.lookup.clone();
        options.depth = DepthLimit::from_arg(self.depth);
        options.dry_run = self.dry_run;
        options.settings = Settings { debug: self.debug };
        Ok(options)
    }
}

/// Execute the archive command
pub fn execute(args: ArchiveArgs, color: &str) -> Result<()> {
    use git_archive_recursive::git::SystemGit;
    use git_archive_recursive::output::{self, Reporter};
    use git_archive_recursive::phases::assemble::TarConcatenator;
    use git_archive_recursive::phases::orchestrator;

    let options = args.to_options(&std::env::current_dir()?)?;

    let git = SystemGit::new(options.settings);
    let concatenator = TarConcatenator::new(options.settings);
    let reporter = Reporter::new(output::color_wanted(color), options.settings, args.quiet);

    orchestrator::execute_archive(&options, &git, &concatenator, &reporter)?;
    Ok(())
}
