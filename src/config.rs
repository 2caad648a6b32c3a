//! # Resolved Options
//!
//! The command line is parsed in the binary; this module holds the validated
//! form of those options that the library pipeline consumes. Keeping the
//! validation here means the orchestrator never sees an unsupported archive
//! format or an ambiguous depth value.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Output extensions recognised when `--format` is not given, longest first.
const KNOWN_EXTENSIONS: &[&str] = &["tar.gz", "tar", "tgz", "zip"];

/// Archive formats the pipeline can assemble.
///
/// Only tar is supported: segments are concatenated with `tar --concatenate`,
/// which has no equivalent for compressed or zip archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
}

impl ArchiveFormat {
    pub const SUPPORTED: &'static [&'static str] = &["tar"];

    /// The name passed to `git archive --format`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
        }
    }

    /// Resolve the format from an explicit value or, failing that, from the
    /// extension of the output file name.
    pub fn resolve(explicit: Option<&str>, output: &Path) -> Result<Self> {
        match explicit {
            Some(value) => value.parse(),
            None => match infer_extension(output) {
                Some(ext) => ext.parse(),
                None => Err(Error::Configuration {
                    message: format!(
                        "cannot infer archive format from output {:?}, only {:?} is supported",
                        output.display().to_string(),
                        Self::SUPPORTED
                    ),
                    hint: Some("pass --format tar or use a .tar output name".to_string()),
                }),
            },
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tar" => Ok(ArchiveFormat::Tar),
            other => Err(Error::Configuration {
                message: format!(
                    "unsupported format {:?}, only {:?} is supported",
                    other,
                    Self::SUPPORTED
                ),
                hint: None,
            }),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn infer_extension(output: &Path) -> Option<&'static str> {
    let name = output.file_name()?.to_str()?;
    KNOWN_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| name.len() > ext.len() + 1 && name.ends_with(&format!(".{}", ext)))
}

/// How deep the submodule walk may descend below the top repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLimit {
    Unlimited,
    /// Number of nested levels still allowed; `Levels(0)` means the current
    /// repository only.
    Levels(usize),
}

impl DepthLimit {
    /// Interpret the CLI value: negative is unlimited, 0 is the top only.
    pub fn from_arg(depth: i64) -> Self {
        if depth < 0 {
            DepthLimit::Unlimited
        } else {
            DepthLimit::Levels(depth as usize)
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, DepthLimit::Levels(0))
    }

    /// The limit that applies to the children of a node at this limit.
    pub fn descend(&self) -> Self {
        match self {
            DepthLimit::Unlimited => DepthLimit::Unlimited,
            DepthLimit::Levels(n) => DepthLimit::Levels(n.saturating_sub(1)),
        }
    }
}

/// Concurrency bound for archive jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLimit {
    /// Start every job immediately.
    Unlimited,
    /// Run each job to completion before the next launch returns.
    Sequential,
    /// At most this many (> 1) jobs running at once.
    Bounded(usize),
}

impl JobLimit {
    /// Interpret the CLI value: 0 (or negative) is unlimited.
    pub fn from_arg(jobs: i64) -> Self {
        match jobs {
            n if n <= 0 => JobLimit::Unlimited,
            1 => JobLimit::Sequential,
            n => JobLimit::Bounded(n as usize),
        }
    }

    /// One job per available CPU.
    pub fn default_parallelism() -> i64 {
        std::thread::available_parallelism()
            .map(|n| n.get() as i64)
            .unwrap_or(1)
    }
}

/// Settings threaded through every component that runs external commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    /// Echo every external command before running it.
    pub debug: bool,
}

/// The fully resolved option set for one archive run.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Revision to archive, anything `git rev-parse` accepts.
    pub revision: String,
    pub output: PathBuf,
    pub format: ArchiveFormat,
    /// Prepended to every path in the archive. Expected to end with `/`.
    pub prefix: String,
    pub jobs: JobLimit,
    /// Extra git-dirs searched for commits of moved or removed submodules.
    pub lookups: Vec<PathBuf>,
    pub depth: DepthLimit,
    pub dry_run: bool,
    /// Directory the top repository is discovered from.
    pub workdir: PathBuf,
    pub settings: Settings,
}

impl ArchiveOptions {
    /// Options with the CLI defaults for everything but the output path.
    pub fn new(output: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            revision: "HEAD".to_string(),
            output: output.into(),
            format: ArchiveFormat::Tar,
            prefix: String::new(),
            jobs: JobLimit::from_arg(JobLimit::default_parallelism()),
            lookups: Vec::new(),
            depth: DepthLimit::Unlimited,
            dry_run: false,
            workdir: workdir.into(),
            settings: Settings::default(),
        }
    }

    /// Path of the transient segment written by the job at `index`.
    pub fn segment_path(&self, index: usize) -> PathBuf {
        let mut name = self.output.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }
}
