//! # git-archive-recursive
//!
//! This library archives a git repository together with all of its
//! submodules, recursively, at any revision. It is what the
//! `git-archive-recursive` command-line tool is built on.
//!
//! Unlike `git submodule foreach git archive`, the submodule commits are the
//! ones pinned by the requested revision, not the ones currently checked out.
//! A submodule that was moved or removed since then is still found, as long
//! as some known git-dir holds its commit.
//!
//! ## Quick Example
//!
//! ```no_run
//! use git_archive_recursive::config::{ArchiveOptions, DepthLimit};
//! use git_archive_recursive::git::SystemGit;
//! use git_archive_recursive::output::Reporter;
//! use git_archive_recursive::phases::assemble::TarConcatenator;
//! use git_archive_recursive::phases::orchestrator::execute_archive;
//!
//! let mut options = ArchiveOptions::new("/tmp/release.tar", ".");
//! options.revision = "v1.2.0".to_string();
//! options.prefix = "release/".to_string();
//! options.depth = DepthLimit::Levels(2);
//!
//! let summary = execute_archive(
//!     &options,
//!     &SystemGit::new(options.settings),
//!     &TarConcatenator::new(options.settings),
//!     &Reporter::silent(),
//! )
//! .unwrap();
//! println!("{} repositories archived", summary.repositories);
//! ```
//!
//! ## Core Concepts
//!
//! - **Options (`config`)**: the validated form of the command line.
//! - **Git layer (`git`)**: the [`git::GitOperations`] trait over every git
//!   query the pipeline needs, and its implementation on the `git` binary.
//! - **Store registry (`registry`)**: the git-dirs a submodule commit may be
//!   found in, with per-path hints.
//! - **Job scheduler (`scheduler`)**: bounded-concurrency child processes,
//!   drained in launch order.
//! - **Phases (`phases`)**: discovery, walk, launch and assembly.
//!
//! Nothing in the library reads global state: the debug flag travels in
//! [`config::Settings`] to every component that runs a command.

pub mod config;
pub mod error;
pub mod git;
pub mod output;
pub mod phases;
pub mod process;
pub mod registry;
pub mod scheduler;

#[cfg(test)]
mod fake_git;
