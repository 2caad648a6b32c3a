//! End-to-end tests for the `git-archive-recursive` binary.
//!
//! Exit codes follow the usual conventions:
//!
//! - Exit code 0: Success, including a dry run
//! - Exit code 1: Any fatal error (configuration, unresolved submodule, git or tar failure)
//! - Exit code 2: Invalid command-line usage (handled by clap)

mod common;

use common::prelude::*;

fn project(fixture: &GitFixture) -> std::path::PathBuf {
    let lib = fixture.repo("lib", &[("lib.txt", "lib")]);
    let top = fixture.repo("top", &[("README", "top")]);
    fixture.add_submodule(&top, &lib, "libs/lib");
    top
}

#[test]
fn test_help() {
    let mut cmd = cargo_bin_cmd!("git-archive-recursive");

    cmd.arg("--help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("--lookup"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("Limitations:"));
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("git-archive-recursive");

    cmd.arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_output_is_a_usage_error() {
    let mut cmd = cargo_bin_cmd!("git-archive-recursive");

    cmd.arg("HEAD")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--output"));
}

#[test]
fn test_archive_with_submodule() {
    let fixture = GitFixture::new();
    let top = project(&fixture);
    let output = fixture.output("out.tar");

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(&top)
        .arg("-o")
        .arg(&output)
        .arg("-p")
        .arg("proj/")
        .arg("--color")
        .arg("never")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Launching git archive 1: proj/\n"))
        .stdout(predicate::str::contains("Launching git archive 2: proj/libs/lib/\n"))
        .stdout(predicate::str::contains("Waiting and concatenating 2/2..."))
        .stdout(predicate::str::ends_with("Done.\n"));

    let entries = list_tar(&output);
    assert!(entries.contains(&"proj/README".to_string()));
    assert!(entries.contains(&"proj/libs/lib/lib.txt".to_string()));
}

#[test]
fn test_archive_from_a_subdirectory() {
    let fixture = GitFixture::new();
    let top = project(&fixture);
    let output = fixture.output("out.tar");

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(top.join("libs"))
        .arg("-o")
        .arg(&output)
        .arg("-q")
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());

    assert!(list_tar(&output).contains(&"libs/lib/lib.txt".to_string()));
}

#[test]
fn test_dry_run() {
    let fixture = GitFixture::new();
    let top = project(&fixture);
    let output = fixture.output("out.tar");

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    let assert = cmd
        .current_dir(&top)
        .arg("--dry-run")
        .arg("-o")
        .arg(&output)
        .arg("--color")
        .arg("never")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Dry-run done."));

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert_eq!(stdout.lines().filter(|l| l.starts_with("Dry-run: ")).count(), 2);
    assert!(!output.exists());
}

#[test]
fn test_sequential_jobs_and_depth() {
    let fixture = GitFixture::new();
    let top = project(&fixture);
    let output = fixture.output("out.tar");

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(&top)
        .args(["-j", "1", "-d", "0", "-o"])
        .arg(&output)
        .assert()
        .code(0);

    let entries = list_tar(&output);
    assert!(entries.contains(&"README".to_string()));
    assert!(!entries.contains(&"libs/lib/lib.txt".to_string()));
}

#[test]
fn test_unsupported_format_fails_before_any_git_query() {
    // Not a repository: a git query would fail with a different message
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(temp.path())
        .arg("-o")
        .arg("out.zip")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported format \"zip\""));

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(temp.path())
        .args(["--format", "tgz", "-o", "out.tar"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported format \"tgz\""));

    temp.child("out.zip").assert(predicate::path::missing());
}

#[test]
fn test_not_a_repository() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(temp.path())
        .args(["-o", "out.tar"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));

    temp.child("out.tar").assert(predicate::path::missing());
}

#[test]
fn test_removed_submodule_and_lookup_from_env() {
    let fixture = GitFixture::new();
    let lib = fixture.repo("lib", &[("lib.txt", "lib")]);
    let top = fixture.repo("top", &[("README", "top")]);
    fixture.add_submodule(&top, &lib, "lib");
    run_git(&top, &["submodule", "deinit", "-f", "lib"]);
    run_git(&top, &["rm", "-q", "-f", "lib"]);
    std::fs::remove_dir_all(top.join(".git/modules/lib")).unwrap();
    fixture.commit(&top, "Remove submodule");
    let output = fixture.output("out.tar");

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(&top)
        .args(["HEAD~1", "-o"])
        .arg(&output)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not find a git-dir for submodule"))
        .stderr(predicate::str::contains("git submodule init"))
        .stderr(predicate::str::contains("FYI, the .gitmodules at that time"));
    assert!(!output.exists());

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(&top)
        .env("GIT_ARCHIVE_RECURSIVE_LOOKUP", &lib)
        .args(["HEAD~1", "-o"])
        .arg(&output)
        .assert()
        .code(0);
    assert!(list_tar(&output).contains(&"lib/lib.txt".to_string()));
}

#[test]
fn test_debug_echoes_commands() {
    let fixture = GitFixture::new();
    let top = project(&fixture);
    let output = fixture.output("out.tar");

    let mut cmd = cargo_bin_cmd!("git-archive-recursive");
    cmd.current_dir(&top)
        .arg("--debug")
        .arg("-n")
        .arg("-o")
        .arg(&output)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("gitdir:"))
        .stderr(predicate::str::contains("running: git"));
}
