//! In-memory `GitOperations` used by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::git::{
    ConfigSource, GitOperations, InitializedSubmodule, ObjectKind, TreeEntry, GITLINK_MODE,
};
use crate::registry::StoreHandle;

#[derive(Debug, Default)]
pub struct FakeGit {
    commits: HashSet<(StoreHandle, String)>,
    trees: HashMap<(StoreHandle, String), Vec<TreeEntry>>,
    configs: HashMap<(StoreHandle, String), Vec<(String, String)>>,
    broken: HashSet<StoreHandle>,
    toplevel: Option<(PathBuf, PathBuf)>,
    refs: HashMap<String, String>,
    submodules: Vec<InitializedSubmodule>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_commit(&mut self, store: &StoreHandle, rev: &str) {
        self.commits.insert((store.clone(), rev.to_string()));
    }

    pub fn has_commit(&self, store: &StoreHandle, rev: &str) -> bool {
        self.commits.contains(&(store.clone(), rev.to_string()))
    }

    /// Register a commit whose tree holds `(path, kind, id)` entries.
    pub fn add_tree(&mut self, store: &StoreHandle, rev: &str, entries: Vec<(&str, &str, &str)>) {
        self.add_commit(store, rev);
        let entries = entries
            .into_iter()
            .map(|(path, kind, id)| TreeEntry {
                mode: if kind == "commit" { GITLINK_MODE } else { "100644" }.to_string(),
                kind: kind.to_string(),
                id: id.to_string(),
                path: path.to_string(),
            })
            .collect();
        self.trees.insert((store.clone(), rev.to_string()), entries);
    }

    /// `.gitmodules` content of `rev` in `store`.
    pub fn add_gitmodules(&mut self, store: &StoreHandle, rev: &str, pairs: &[(&str, &str)]) {
        self.configs.insert(
            (store.clone(), rev.to_string()),
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
    }

    /// Every query against `store` fails.
    pub fn fail_store(&mut self, store: &StoreHandle) {
        self.broken.insert(store.clone());
    }

    pub fn set_toplevel(&mut self, top: impl Into<PathBuf>, git_dir: impl Into<PathBuf>) {
        self.toplevel = Some((top.into(), git_dir.into()));
    }

    pub fn add_ref(&mut self, name: &str, commit: &str) {
        self.refs.insert(name.to_string(), commit.to_string());
    }

    pub fn add_initialized(&mut self, name: &str, path: impl Into<PathBuf>, store: impl Into<PathBuf>) {
        self.submodules.push(InitializedSubmodule {
            name: name.to_string(),
            path: path.into(),
            store: store.into(),
        });
    }

    fn check(&self, store: &StoreHandle) -> Result<()> {
        if self.broken.contains(store) {
            return Err(Error::ExternalProcess {
                command: format!("git --git-dir {}", store),
                code: Some(128),
                stderr: Some("fatal: not a git repository".to_string()),
            });
        }
        Ok(())
    }

    fn not_a_repo(workdir: &Path) -> Error {
        Error::ExternalProcess {
            command: format!("git -C {} rev-parse", workdir.display()),
            code: Some(128),
            stderr: Some("fatal: not a git repository".to_string()),
        }
    }
}

impl GitOperations for FakeGit {
    fn toplevel(&self, workdir: &Path) -> Result<PathBuf> {
        self.toplevel
            .as_ref()
            .map(|(top, _)| top.clone())
            .ok_or_else(|| Self::not_a_repo(workdir))
    }

    fn absolute_git_dir(&self, workdir: &Path) -> Result<PathBuf> {
        self.toplevel
            .as_ref()
            .map(|(_, git_dir)| git_dir.clone())
            .ok_or_else(|| Self::not_a_repo(workdir))
    }

    fn resolve_commit(&self, workdir: &Path, rev: &str) -> Result<String> {
        self.refs
            .get(rev)
            .cloned()
            .ok_or_else(|| Self::not_a_repo(workdir))
    }

    fn is_valid_object(&self, store: &StoreHandle, id: &str, kind: ObjectKind) -> Result<bool> {
        self.check(store)?;
        Ok(kind == ObjectKind::Commit && self.has_commit(store, id))
    }

    fn list_tree(&self, store: &StoreHandle, rev: &str) -> Result<Vec<TreeEntry>> {
        self.check(store)?;
        Ok(self
            .trees
            .get(&(store.clone(), rev.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn initialized_submodules(&self, _top: &Path) -> Result<Vec<InitializedSubmodule>> {
        Ok(self.submodules.clone())
    }

    fn config_list(
        &self,
        store: Option<&StoreHandle>,
        source: &ConfigSource,
    ) -> Result<Option<Vec<(String, String)>>> {
        let (Some(store), ConfigSource::Blob(blob)) = (store, source) else {
            return Ok(None);
        };
        let Some(rev) = blob.strip_suffix(":.gitmodules") else {
            return Ok(None);
        };
        Ok(self.configs.get(&(store.clone(), rev.to_string())).cloned())
    }
}
