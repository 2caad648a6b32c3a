//! Shared test utilities for integration and E2E tests.
//!
//! Builds real repositories with the system `git` binary inside a temporary
//! directory. Every repository commits with a fixed identity, so the tests
//! do not depend on the user's git configuration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = GitFixture::new();
//! let lib = fixture.repo("lib", &[("lib.txt", "lib")]);
//! let top = fixture.repo("top", &[("README", "top")]);
//! fixture.add_submodule(&top, &lib, "libs/lib");
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{list_tar, run_git, GitFixture};
}

/// Run a git command in `dir` and return its trimmed stdout, panicking on failure.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-c")
        .arg("protocol.file.allow=always")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("git command failed to execute");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Names of the entries of a tar archive, in archive order.
pub fn list_tar(archive: &Path) -> Vec<String> {
    let output = Command::new("tar")
        .arg("-tf")
        .arg(archive)
        .output()
        .expect("tar failed to execute");
    assert!(
        output.status.success(),
        "tar -tf {} failed: {}",
        archive.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// A temporary directory holding the repositories of one test.
pub struct GitFixture {
    temp_dir: assert_fs::TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create repository `name` with one commit holding `files`.
    pub fn repo(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create repository directory");
        run_git(&dir, &["init", "-q"]);
        for (path, content) in files {
            let file = dir.join(path);
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create directory");
            }
            std::fs::write(&file, content).expect("Failed to write file");
        }
        self.commit(&dir, "Initial commit");
        dir
    }

    /// Stage everything in `repo` and commit it.
    pub fn commit(&self, repo: &Path, message: &str) {
        run_git(repo, &["add", "-A"]);
        run_git(repo, &["commit", "-q", "-m", message]);
    }

    /// Add `source` as a submodule of `repo` at `path`, with its own
    /// submodules initialized, and commit.
    pub fn add_submodule(&self, repo: &Path, source: &Path, path: &str) {
        let url = source.to_str().expect("temp paths are UTF-8");
        run_git(repo, &["submodule", "add", url, path]);
        run_git(repo, &["submodule", "update", "--init", "--recursive"]);
        self.commit(repo, &format!("Add submodule {}", path));
    }

    /// Commit id of `rev` in `repo`.
    #[allow(dead_code)]
    pub fn rev_parse(&self, repo: &Path, rev: &str) -> String {
        run_git(repo, &["rev-parse", rev])
    }

    /// Path of a not yet existing file in the temp directory.
    pub fn output(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}
