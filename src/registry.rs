//! # Git-dir Registry
//!
//! Archiving an old revision means finding, for every submodule commit pinned
//! at that revision, a git-dir that actually contains it. The current
//! `.gitmodules` only describes where submodules live *today*, so the
//! registry keeps every candidate git-dir keyed by a path hint and searches
//! in two passes:
//!
//! 1. the git-dirs registered under the hinted path, which is right as long
//!    as the submodule was not moved;
//! 2. every registered git-dir, in registration order, which handles moved,
//!    renamed and removed submodules (the latter through `--lookup` stores).
//!
//! The second pass assumes a commit id never exists in two unrelated
//! repositories. A collision would silently archive the wrong repository's
//! content; the registry does not attempt to detect it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::git::{GitOperations, ObjectKind};

/// Key used to order the search. Never used for correctness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathHint {
    /// Absolute working path of a repository.
    Path(String),
    /// Stores supplied by the operator with `--lookup`.
    Fallback,
}

impl PathHint {
    pub fn path(path: impl AsRef<Path>) -> Self {
        PathHint::Path(path.as_ref().to_string_lossy().into_owned())
    }
}

impl fmt::Display for PathHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathHint::Path(p) => f.write_str(p),
            PathHint::Fallback => f.write_str("--lookup"),
        }
    }
}

/// A git-dir. The registry only ever reads from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreHandle(PathBuf);

impl StoreHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Candidate git-dirs grouped by path hint, in registration order.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    hints: Vec<(PathHint, Vec<StoreHandle>)>,
    index: HashMap<PathHint, usize>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under `hint`. Adding the same store twice under one
    /// hint is a no-op.
    pub fn add(&mut self, hint: PathHint, store: StoreHandle) {
        let slot = match self.index.get(&hint) {
            Some(&slot) => slot,
            None => {
                self.hints.push((hint.clone(), Vec::new()));
                self.index.insert(hint, self.hints.len() - 1);
                self.hints.len() - 1
            }
        };
        let stores = &mut self.hints[slot].1;
        if !stores.contains(&store) {
            stores.push(store);
        }
    }

    /// Stores registered under `hint`, in insertion order.
    pub fn stores_for(&self, hint: &PathHint) -> &[StoreHandle] {
        self.index
            .get(hint)
            .map(|&slot| self.hints[slot].1.as_slice())
            .unwrap_or(&[])
    }

    /// Every registered store, hint by hint, in registration order.
    pub fn all_stores(&self) -> impl Iterator<Item = &StoreHandle> {
        self.hints.iter().flat_map(|(_, stores)| stores.iter())
    }

    /// Find a store containing `rev` as a commit, starting with the stores
    /// registered under `hint`. `Ok(None)` when no store has it.
    pub fn find<G: GitOperations + ?Sized>(
        &self,
        git: &G,
        hint: &PathHint,
        rev: &str,
    ) -> Result<Option<StoreHandle>> {
        for store in self.stores_for(hint) {
            if git.is_valid_object(store, rev, ObjectKind::Commit)? {
                return Ok(Some(store.clone()));
            }
        }
        for store in self.all_stores() {
            if git.is_valid_object(store, rev, ObjectKind::Commit)? {
                return Ok(Some(store.clone()));
            }
        }
        Ok(None)
    }
}
