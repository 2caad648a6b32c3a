//! CLI argument parsing and dispatch

use anyhow::Result;
use clap::Parser;

use crate::commands;

const AFTER_LONG_HELP: &str = "\
Submodule git-dirs are looked up in this order:
  1. the git-dir of the submodule initialized at the same path today
  2. every other known git-dir: the top repository, all initialized
     submodules, then the --lookup directories, in that order
The first git-dir holding the pinned commit wins.

Limitations:
  Only the tar format is supported, since segments are joined with
  `tar --concatenate`. Each submodule keeps its own pax global header, so
  `tar --list` shows the commit of the top repository only.";

/// Archive a git repository and its submodules, recursively, at any revision
#[derive(Parser, Debug)]
#[command(name = "git-archive-recursive")]
#[command(version, about, long_about = None, after_long_help = AFTER_LONG_HELP)]
pub struct Cli {
    #[command(flatten)]
    archive: commands::archive::ArchiveArgs,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Execute the archive command
    pub fn execute(self) -> Result<()> {
        let level = if self.archive.debug {
            "debug"
        } else {
            self.log_level.as_str()
        };
        // A logger may already be installed when running under a test harness
        let _ = env_logger::Builder::new().parse_filters(level).try_init();

        commands::archive::execute(self.archive, &self.color)
    }
}
