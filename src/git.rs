//! # Git Queries
//!
//! Read-only queries against git repositories, run through the system `git`
//! binary. The [`GitOperations`] trait is the seam between the archiving
//! pipeline and git so the walker and the registry can be tested against an
//! in-memory fake.
//!
//! Repositories are addressed two ways:
//! - by working directory (`git -C <dir>`), for discovering the top
//!   repository and its initialized submodules;
//! - by git-dir (`git --git-dir <store>`), for everything that must work on a
//!   store whose checkout moved or no longer exists.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::process::{self, Capture, CommandOutput, CommandSpec};
use crate::registry::StoreHandle;

/// Object types that `rev-parse` can peel to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tree entry mode of a gitlink.
pub const GITLINK_MODE: &str = "160000";

/// One line of `git ls-tree` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: String,
    /// `blob`, `tree` or `commit` (a gitlink).
    pub kind: String,
    pub id: String,
    pub path: String,
}

impl TreeEntry {
    /// Gitlinks point to a commit in a nested repository.
    pub fn is_gitlink(&self) -> bool {
        self.mode == GITLINK_MODE && self.kind == "commit"
    }
}

/// A nested repository currently initialized in the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedSubmodule {
    pub name: String,
    /// Absolute path of the submodule checkout.
    pub path: PathBuf,
    /// Absolute path of its git-dir.
    pub store: PathBuf,
}

/// Where `git config --list` reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A blob named like `<rev>:.gitmodules`.
    Blob(String),
    File(PathBuf),
}

/// Trait for git queries - allows faking in tests
pub trait GitOperations {
    /// Absolute path of the working tree containing `workdir`.
    fn toplevel(&self, workdir: &Path) -> Result<PathBuf>;

    /// Absolute git-dir of the repository containing `workdir`.
    fn absolute_git_dir(&self, workdir: &Path) -> Result<PathBuf>;

    /// Resolve `rev` to a full commit id in the repository containing `workdir`.
    fn resolve_commit(&self, workdir: &Path, rev: &str) -> Result<String>;

    /// Whether `id` names an object of type `kind` inside `store`.
    fn is_valid_object(&self, store: &StoreHandle, id: &str, kind: ObjectKind) -> Result<bool>;

    /// Every entry of the tree at `rev`, recursively, in listing order.
    fn list_tree(&self, store: &StoreHandle, rev: &str) -> Result<Vec<TreeEntry>>;

    /// Initialized submodules below `top`, recursively.
    fn initialized_submodules(&self, top: &Path) -> Result<Vec<InitializedSubmodule>>;

    /// Flat key/value pairs of a config blob or file. `None` when git cannot
    /// read it, e.g. the blob does not exist at that revision.
    fn config_list(
        &self,
        store: Option<&StoreHandle>,
        source: &ConfigSource,
    ) -> Result<Option<Vec<(String, String)>>>;

    /// Gitlink entries `(relative path, pinned commit)` of the tree at `rev`.
    fn submodules_at(&self, store: &StoreHandle, rev: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .list_tree(store, rev)?
            .into_iter()
            .filter(TreeEntry::is_gitlink)
            .map(|entry| (entry.path, entry.id))
            .collect())
    }
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
#[derive(Debug, Clone, Default)]
pub struct SystemGit {
    settings: Settings,
}

impl SystemGit {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn in_workdir(workdir: &Path) -> CommandSpec {
        CommandSpec::new("git").arg("-C").arg(workdir)
    }

    fn in_store(store: &StoreHandle) -> CommandSpec {
        CommandSpec::new("git").arg("--git-dir").arg(store.path())
    }

    /// Run and return trimmed stdout, failing on a non-zero exit.
    fn query(&self, spec: CommandSpec) -> Result<String> {
        let out = process::run(&spec, Capture::ALL, self.settings)?.require_success(&spec)?;
        Ok(out.stdout_str().trim_end_matches('\n').to_string())
    }

    fn query_path(&self, spec: CommandSpec) -> Result<PathBuf> {
        let command = spec.to_string();
        let path = PathBuf::from(self.query(spec)?);
        if !path.is_absolute() {
            return Err(Error::GitOutput {
                command,
                message: format!("expected an absolute path, got {:?}", path),
            });
        }
        Ok(path)
    }
}

impl GitOperations for SystemGit {
    fn toplevel(&self, workdir: &Path) -> Result<PathBuf> {
        self.query_path(Self::in_workdir(workdir).args(["rev-parse", "--show-toplevel"]))
    }

    fn absolute_git_dir(&self, workdir: &Path) -> Result<PathBuf> {
        self.query_path(Self::in_workdir(workdir).args(["rev-parse", "--absolute-git-dir"]))
    }

    fn resolve_commit(&self, workdir: &Path, rev: &str) -> Result<String> {
        let spec = Self::in_workdir(workdir).args([
            "rev-parse".to_string(),
            "--verify".to_string(),
            "-q".to_string(),
            format!("{}^{{commit}}", rev),
        ]);
        let out = process::run(&spec, Capture::ALL, self.settings)?;
        if !out.success() {
            return Err(Error::ExternalProcess {
                command: spec.to_string(),
                code: out.status.code(),
                stderr: Some(format!("cannot resolve {:?} to a commit", rev)),
            });
        }
        Ok(out.stdout_str().trim().to_string())
    }

    fn is_valid_object(&self, store: &StoreHandle, id: &str, kind: ObjectKind) -> Result<bool> {
        let spec = Self::in_store(store).args([
            "rev-parse".to_string(),
            "-q".to_string(),
            "--verify".to_string(),
            format!("{}^{{{}}}", id, kind),
        ]);
        let out = process::run(&spec, Capture::ALL, self.settings)?;
        check_verified_object(store, id, &out)
    }

    fn list_tree(&self, store: &StoreHandle, rev: &str) -> Result<Vec<TreeEntry>> {
        let spec = Self::in_store(store).args(["ls-tree", "-r", "--full-tree", "-z", rev]);
        let command = spec.to_string();
        let out = process::run(&spec, Capture::ALL, self.settings)?.require_success(&spec)?;
        parse_ls_tree(out.stdout_str()).map_err(|message| Error::GitOutput { command, message })
    }

    fn initialized_submodules(&self, top: &Path) -> Result<Vec<InitializedSubmodule>> {
        let spec = Self::in_workdir(top).args([
            "submodule",
            "foreach",
            "-q",
            "--recursive",
            r#"printf '%s\t%s\t%s\t%s\n' "$name" "$sm_path" "$toplevel" "$(git rev-parse --absolute-git-dir)""#,
        ]);
        let command = spec.to_string();
        let out = process::run(&spec, Capture::ALL, self.settings)?.require_success(&spec)?;
        let submodules = parse_foreach_output(out.stdout_str())
            .map_err(|message| Error::GitOutput {
                command: command.clone(),
                message,
            })?;
        for submodule in &submodules {
            if !submodule.store.is_dir() {
                return Err(Error::GitOutput {
                    command,
                    message: format!("invalid submodule git dir {:?}", submodule.store),
                });
            }
        }
        Ok(submodules)
    }

    fn config_list(
        &self,
        store: Option<&StoreHandle>,
        source: &ConfigSource,
    ) -> Result<Option<Vec<(String, String)>>> {
        let spec = match store {
            Some(store) => Self::in_store(store),
            None => CommandSpec::new("git"),
        };
        let spec = match source {
            ConfigSource::Blob(blob) => spec.arg("config").arg("--blob").arg(blob),
            ConfigSource::File(file) => spec.arg("config").arg("--file").arg(file),
        }
        .args(["--list", "-z"]);
        let out = process::run(&spec, Capture::ALL, self.settings)?;
        if !out.success() {
            return Ok(None);
        }
        Ok(Some(parse_config_list(out.stdout_str())))
    }
}

/// Interpret `rev-parse --verify <id>^{<kind>}`: a failure means `id` is not
/// such an object in `store`; success must echo `id` back unchanged.
pub fn check_verified_object(store: &StoreHandle, id: &str, out: &CommandOutput) -> Result<bool> {
    if !out.success() {
        return Ok(false);
    }
    let resolved = out.stdout_str().trim();
    if resolved != id {
        return Err(Error::InvariantViolation {
            message: format!(
                "unexpected rev-parse {:?} vs {:?} in {}",
                resolved,
                id,
                store.path().display()
            ),
        });
    }
    Ok(true)
}

/// Parse `git ls-tree -z` output: `<mode> SP <type> SP <object> TAB <file> NUL`.
pub fn parse_ls_tree(stdout: &str) -> std::result::Result<Vec<TreeEntry>, String> {
    stdout
        .split('\0')
        .filter(|record| !record.is_empty())
        .map(|record| {
            let (meta, path) = record
                .split_once('\t')
                .ok_or_else(|| format!("missing tab in ls-tree record {:?}", record))?;
            let mut fields = meta.split(' ');
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(mode), Some(kind), Some(id), None) => Ok(TreeEntry {
                    mode: mode.to_string(),
                    kind: kind.to_string(),
                    id: id.to_string(),
                    path: path.to_string(),
                }),
                _ => Err(format!("malformed ls-tree record {:?}", record)),
            }
        })
        .collect()
}

/// Parse the tab separated `name, sm_path, toplevel, git-dir` records
/// printed by the `submodule foreach` query.
pub fn parse_foreach_output(stdout: &str) -> std::result::Result<Vec<InitializedSubmodule>, String> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.splitn(4, '\t').collect();
            let &[name, rel_path, parent, git_dir] = fields.as_slice() else {
                return Err(format!("malformed submodule record {:?}", line));
            };
            if parent.ends_with('/') {
                return Err(format!("expected no trailing / in toplevel {:?}", parent));
            }
            if rel_path.starts_with('/') {
                return Err(format!("expected a relative submodule path, got {:?}", rel_path));
            }
            let store = PathBuf::from(git_dir);
            if !store.is_absolute() {
                return Err(format!("expected an absolute git dir, got {:?}", git_dir));
            }
            Ok(InitializedSubmodule {
                name: name.to_string(),
                path: PathBuf::from(format!("{}/{}", parent, rel_path)),
                store,
            })
        })
        .collect()
}

/// Parse `git config --list -z` output: `key LF value NUL`, where a key with
/// no value has no LF.
pub fn parse_config_list(stdout: &str) -> Vec<(String, String)> {
    stdout
        .split('\0')
        .filter(|record| !record.is_empty())
        .map(|record| match record.split_once('\n') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (record.to_string(), String::new()),
        })
        .collect()
}

/// Extract the `.gitmodules` entry whose `path` is `path`.
///
/// Submodules are matched by path, not name. The result starts with the
/// submodule name followed by every `submodule.<name>.*` key with that prefix
/// stripped, in listing order.
pub fn extract_submodule_config(
    configs: &[(String, String)],
    path: &str,
) -> Option<Vec<(String, String)>> {
    let name = configs.iter().find_map(|(key, value)| {
        let name = key.strip_prefix("submodule.")?.strip_suffix(".path")?;
        (value == path).then_some(name)
    })?;

    let prefix = format!("submodule.{}.", name);
    let mut config = vec![("name".to_string(), name.to_string())];
    config.extend(configs.iter().filter_map(|(key, value)| {
        key.strip_prefix(&prefix)
            .map(|rest| (rest.to_string(), value.clone()))
    }));
    Some(config)
}
