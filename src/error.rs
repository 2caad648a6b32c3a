//! # Error Handling
//!
//! This module defines the centralized error type for `git-archive-recursive`.
//! It uses `thiserror` to describe every failure mode the archiving pipeline
//! can run into, with enough context to tell the operator what went wrong and
//! where.
//!
//! ## Key Components
//!
//! - **`Error`**: the enum of all fatal conditions. Warnings (such as a
//!   segment file that could not be removed) are logged, never returned.
//! - **`Result<T>`**: alias for `std::result::Result<T, Error>`.
//!
//! The variants map onto the failure taxonomy of the tool:
//!
//! - Configuration errors, detected before any git query runs.
//! - Unresolved submodules, when a pinned commit exists in no known git-dir.
//! - External process failures, for `git` and `tar` exiting non-zero.
//! - Spawn failures and unparseable git output.
//! - Internal invariant violations.
//! - I/O errors.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for git-archive-recursive operations
#[derive(Error, Debug)]
pub enum Error {
    /// The resolved options cannot be used, e.g. an unsupported archive format.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Configuration {
        message: String,
        /// Optional hint for how to fix the option
        hint: Option<String>,
    },

    /// A submodule's pinned commit could not be found in any registered git-dir.
    #[error("{}", render_unresolved(.0))]
    UnresolvedSubmodule(Box<UnresolvedSubmodule>),

    /// An external command exited with a non-zero status.
    #[error("command failed with exit {}: {command}{}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()), stderr.as_ref().map(|s| format!("\n{}", s.trim_end())).unwrap_or_default())]
    ExternalProcess {
        command: String,
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// An external command could not be started at all.
    #[error("failed to run {command}: {message}")]
    ProcessSpawn { command: String, message: String },

    /// A git query produced output that does not follow its documented format.
    #[error("unexpected output from {command}: {message}")]
    GitOutput { command: String, message: String },

    /// An internal assumption did not hold.
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Context reported when a submodule commit cannot be located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSubmodule {
    /// Full path of the submodule (parent path + "/" + relative path).
    pub full_path: String,
    /// Path of the submodule relative to its parent.
    pub path: String,
    /// The commit pinned by the parent.
    pub commit: String,
    pub parent_path: String,
    pub parent_git_dir: PathBuf,
    pub parent_commit: String,
    /// The `.gitmodules` entry describing this path at the parent commit, if
    /// it could be recovered.
    pub historical_config: Option<Vec<(String, String)>>,
}

fn render_unresolved(u: &UnresolvedSubmodule) -> String {
    let mut out = format!(
        "Could not find a git-dir for submodule {} commit {}:\n  \
         submodule commit: {}\n  \
         submodule path in parent: {}\n  \
         parent path: {}\n  \
         parent git-dir: {}\n  \
         parent commit: {}\n\
         (Maybe it just hasn't been `git submodule init` ?)",
        u.full_path,
        u.commit,
        u.commit,
        u.path,
        u.parent_path,
        u.parent_git_dir.display(),
        u.parent_commit,
    );
    if let Some(config) = &u.historical_config {
        out.push_str("\nFYI, the .gitmodules at that time described it like that:");
        for (key, value) in config {
            let _ = write!(out, "\n  {}: {}", key, value);
        }
    }
    out
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
