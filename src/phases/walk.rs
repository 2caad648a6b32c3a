//! Phase 2: Submodule Walk
//!
//! Enumerates the repositories to archive at a given revision: the top
//! repository, then every gitlink found in its tree, resolved to a git-dir
//! through the registry, recursively.
//!
//! ## Ordering
//!
//! The walk is depth-first and pre-order: a repository is produced before any
//! of its submodules, and a submodule's whole subtree is produced before its
//! next sibling. Siblings follow `git ls-tree` order. Archive segments are
//! concatenated in exactly this order.
//!
//! ## Laziness and failure
//!
//! [`SubmoduleWalk`] is an iterator, so the caller can start archiving the
//! first repositories while the rest of the tree is still being resolved.
//! The first error (an unresolved submodule commit or a failed git query) is
//! yielded once and ends the walk; the caller decides what to do about it.

use log::info;

use super::RepositoryNode;
use crate::config::DepthLimit;
use crate::error::{Error, Result, UnresolvedSubmodule};
use crate::git::{extract_submodule_config, ConfigSource, GitOperations};
use crate::registry::{PathHint, StoreRegistry};

/// Walk the repositories reachable from `root`, at most `depth` levels down.
pub fn walk<'a, G: GitOperations + ?Sized>(
    git: &'a G,
    registry: &'a StoreRegistry,
    root: RepositoryNode,
    depth: DepthLimit,
) -> SubmoduleWalk<'a, G> {
    SubmoduleWalk {
        git,
        registry,
        root: Some((root, depth)),
        stack: Vec::new(),
        finished: false,
    }
}

/// A repository whose gitlinks are being visited.
struct Frame {
    node: RepositoryNode,
    depth: DepthLimit,
    /// Listed on first visit, so listing happens after the node is yielded.
    entries: Option<std::vec::IntoIter<(String, String)>>,
}

/// Iterator returned by [`walk`].
pub struct SubmoduleWalk<'a, G: GitOperations + ?Sized> {
    git: &'a G,
    registry: &'a StoreRegistry,
    root: Option<(RepositoryNode, DepthLimit)>,
    stack: Vec<Frame>,
    finished: bool,
}

impl<G: GitOperations + ?Sized> SubmoduleWalk<'_, G> {
    fn enter(&mut self, node: RepositoryNode, depth: DepthLimit) -> RepositoryNode {
        if depth.is_exhausted() {
            info!("Skipping submodules of {} and below (depth limit)", node.path);
        } else {
            self.stack.push(Frame {
                node: node.clone(),
                depth,
                entries: None,
            });
        }
        node
    }

    fn fail(&mut self, error: Error) -> Option<Result<RepositoryNode>> {
        self.finished = true;
        self.stack.clear();
        Some(Err(error))
    }

    /// Build the unresolved-submodule error, enriched with the parent's
    /// `.gitmodules` entry when it can be read.
    fn unresolved(&self, parent: &RepositoryNode, path: String, full_path: String, commit: String) -> Error {
        let blob = ConfigSource::Blob(format!("{}:.gitmodules", parent.revision));
        let historical_config = match self.git.config_list(Some(&parent.store), &blob) {
            Ok(Some(configs)) => extract_submodule_config(&configs, &path),
            _ => None,
        };
        Error::UnresolvedSubmodule(Box::new(UnresolvedSubmodule {
            full_path,
            path,
            commit,
            parent_path: parent.path.clone(),
            parent_git_dir: parent.store.path().to_path_buf(),
            parent_commit: parent.revision.clone(),
            historical_config,
        }))
    }
}

impl<G: GitOperations + ?Sized> Iterator for SubmoduleWalk<'_, G> {
    type Item = Result<RepositoryNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some((root, depth)) = self.root.take() {
            return Some(Ok(self.enter(root, depth)));
        }

        loop {
            let git = self.git;
            let frame = self.stack.last_mut()?;
            if frame.entries.is_none() {
                match git.submodules_at(&frame.node.store, &frame.node.revision) {
                    Ok(entries) => frame.entries = Some(entries.into_iter()),
                    Err(e) => return self.fail(e),
                }
            }
            let Some((path, commit)) = frame.entries.as_mut().and_then(Iterator::next) else {
                self.stack.pop();
                continue;
            };

            if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
                let message = format!("malformed gitlink path {:?} in {}", path, frame.node.path);
                return self.fail(Error::InvariantViolation { message });
            }
            let full_path = format!("{}/{}", frame.node.path, path);
            let parent = frame.node.clone();
            let child_depth = frame.depth.descend();

            let hint = PathHint::Path(full_path.clone());
            return match self.registry.find(git, &hint, &commit) {
                Ok(Some(store)) => {
                    let child = RepositoryNode::new(full_path, store, commit);
                    Some(Ok(self.enter(child, child_depth)))
                }
                Ok(None) => {
                    let error = self.unresolved(&parent, path, full_path, commit);
                    self.fail(error)
                }
                Err(e) => self.fail(e),
            };
        }
    }
}
