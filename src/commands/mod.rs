//! # CLI Command Implementations
//!
//! The tool has a single command, so there are no subcommands: the archive
//! arguments are flattened into the top-level parser.
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `git_archive_recursive` library to perform the work.

pub mod archive;
