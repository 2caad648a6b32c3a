//! Phase 1: Discovery
//!
//! Builds the [`StoreRegistry`] the walk resolves submodule commits against.
//!
//! ## Process
//!
//! 1.  **Top repository**: the working tree and git-dir containing the
//!     working directory are registered first, keyed by the top path.
//! 2.  **Initialized submodules**: every submodule currently initialized below
//!     the top (recursively) is registered under its absolute path. This is
//!     what makes the common case, where the layout did not change since the
//!     archived revision, resolve on the first try.
//! 3.  **Lookup stores**: git-dirs passed with `--lookup` are registered under
//!     the fallback hint. They are only reached by the exhaustive search.

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;
use crate::git::GitOperations;
use crate::registry::{PathHint, StoreHandle, StoreRegistry};

/// Result of Phase 1.
#[derive(Debug)]
pub struct DiscoveredStores {
    /// Absolute path of the top working tree.
    pub top: PathBuf,
    pub top_store: StoreHandle,
    pub registry: StoreRegistry,
}

/// Executes Phase 1 of the pipeline.
pub fn execute<G: GitOperations + ?Sized>(
    git: &G,
    workdir: &Path,
    lookups: &[PathBuf],
) -> Result<DiscoveredStores> {
    let top = git.toplevel(workdir)?;
    let top_store = StoreHandle::new(git.absolute_git_dir(workdir)?);

    let mut registry = StoreRegistry::new();
    registry.add(PathHint::path(&top), top_store.clone());

    for submodule in git.initialized_submodules(&top)? {
        debug!(
            "registering submodule {} at {} ({})",
            submodule.name,
            submodule.path.display(),
            submodule.store.display()
        );
        registry.add(PathHint::path(&submodule.path), StoreHandle::new(submodule.store));
    }

    for lookup in lookups {
        registry.add(PathHint::Fallback, StoreHandle::new(lookup_git_dir(lookup)));
    }

    Ok(DiscoveredStores {
        top,
        top_store,
        registry,
    })
}

/// Accept a working tree for `--lookup` by using its `.git` directory.
fn lookup_git_dir(lookup: &Path) -> PathBuf {
    let dot_git = lookup.join(".git");
    if dot_git.is_dir() {
        dot_git
    } else {
        lookup.to_path_buf()
    }
}
