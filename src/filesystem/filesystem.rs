use derive_more::Display;
use snafu::Snafu;
use tracing::{debug, info};

use crate::node::{Node, NodeError, NodeSetError};
use crate::path::NodePath;

/// Why a path could not be used for an operation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PathProblem {
    #[display("no such node")]
    NotFound,
    #[display("parent directory does not exist")]
    ParentNotFound,
    #[display("target does not exist")]
    TargetNotFound,
    #[display("not a directory")]
    NotADirectory,
    #[display("already exists")]
    AlreadyExists,
    #[display("the root cannot be removed or moved")]
    RootForbidden,
    #[display("directories can only be removed recursively")]
    RecursiveRequired,
    #[display("a sibling with the same name exists")]
    NameCollision,
    #[display("a directory cannot be moved into itself")]
    MoveIntoItself,
    #[display("malformed path")]
    Malformed,
    #[display("path has no final component")]
    NamelessPath,
    #[display("working directory is no longer part of the tree")]
    DetachedWorkingDirectory,
}

impl PathProblem {
    /// Coarse classification of a node level failure.
    pub fn from_node_error(error: &NodeError) -> Self {
        match error {
            NodeError::InvalidName { .. } => PathProblem::Malformed,
            NodeError::Membership {
                source: NodeSetError::DuplicateName { .. },
                ..
            } => PathProblem::NameCollision,
            NodeError::Membership {
                source: NodeSetError::NotFound { .. },
                ..
            } => PathProblem::NotFound,
            NodeError::NotADirectory { .. } | NodeError::NotALeaf { .. } => {
                PathProblem::NotADirectory
            }
            NodeError::Cycle { .. } => PathProblem::MoveIntoItself,
            NodeError::RootNotAttachable { .. } => PathProblem::RootForbidden,
            NodeError::MissingKey { .. } | NodeError::WatcherFailed { .. } => {
                PathProblem::Malformed
            }
        }
    }
}

/// A rooted tree of directories and leaves.
///
/// Cloning a `Filesystem` yields another handle to the same tree, which is
/// how several shells share one tree.
pub struct Filesystem<D, M> {
    root: Node<D, M>,
}

impl<D, M> Filesystem<D, M> {
    pub fn new() -> Self {
        Self { root: Node::root() }
    }

    pub fn root(&self) -> Node<D, M> {
        self.root.clone()
    }

    /// Whether `node` is currently reachable from this tree's root.
    pub fn contains(&self, node: &Node<D, M>) -> bool {
        node.top() == self.root
    }

    pub fn exists(&self, path: &NodePath) -> bool {
        self.get_node(path).is_ok()
    }

    /// Walks from the root along every component of `path`.
    ///
    /// Relative paths are walked from the root as well.
    pub fn get_node(&self, path: &NodePath) -> Result<Node<D, M>, FilesystemError> {
        let mut node = self.root.clone();
        for part in path.parts() {
            node = match node.get_child(part) {
                Ok(child) => child,
                Err(NodeError::NotADirectory { .. }) => {
                    return Err(FilesystemError::InvalidPath {
                        path: path.to_string(),
                        problem: PathProblem::NotADirectory,
                    });
                }
                Err(_) => {
                    debug!("Lookup of {} stopped at missing '{}'", path, part);
                    return Err(FilesystemError::NotFound {
                        path: path.to_string(),
                    });
                }
            };
        }
        Ok(node)
    }

    /// Looks up a node that has to be a directory.
    pub fn get_directory(&self, path: &NodePath) -> Result<Node<D, M>, FilesystemError> {
        let node = self.get_node(path)?;
        if !node.is_directory() {
            return Err(invalid(path, PathProblem::NotADirectory));
        }
        Ok(node)
    }

    /// Detaches the node at `path` and hands the subtree to the caller.
    pub fn remove_node(&self, path: &NodePath) -> Result<Node<D, M>, FilesystemError> {
        let Some(name) = path.name() else {
            return Err(invalid(path, PathProblem::RootForbidden));
        };

        let parent = self
            .get_directory(&path.parent())
            .map_err(|err| match err {
                FilesystemError::NotFound { .. } => invalid(path, PathProblem::ParentNotFound),
                FilesystemError::InvalidPath { problem, .. } => invalid(path, problem),
            })?;

        let removed = parent
            .remove_child(name)
            .map_err(|err| invalid(path, PathProblem::from_node_error(&err)))?;
        info!("Removed {}", path);
        Ok(removed)
    }

    /// Moves `source` below `target`, like `mv`.
    ///
    /// An existing `target` must be a directory and becomes the new parent.
    /// A missing `target` whose parent exists names the destination: the
    /// source is moved into that parent and renamed to the final component.
    /// The rename and the move either both happen or neither does.
    pub fn move_node(&self, source: &NodePath, target: &NodePath) -> Result<(), FilesystemError> {
        if source.name().is_none() {
            return Err(invalid(source, PathProblem::NamelessPath));
        }
        let Some(target_name) = target.name() else {
            return Err(invalid(target, PathProblem::NamelessPath));
        };

        let node = self.get_node(source).map_err(|err| match err {
            FilesystemError::NotFound { .. } => invalid(source, PathProblem::NotFound),
            other => other,
        })?;

        let (new_parent, new_name) = match self.get_node(target) {
            Ok(existing) => (existing, None),
            Err(FilesystemError::NotFound { .. }) => {
                let parent = self
                    .get_node(&target.parent())
                    .map_err(|_| invalid(target, PathProblem::TargetNotFound))?;
                (parent, Some(target_name))
            }
            Err(other) => return Err(other),
        };

        if !new_parent.is_directory() {
            return Err(invalid(target, PathProblem::NotADirectory));
        }

        node.move_to(&new_parent, new_name)
            .map_err(|err| invalid(target, PathProblem::from_node_error(&err)))?;
        info!("Moved {} to {}", source, node.get_path());
        Ok(())
    }
}

impl<D, M> Clone for Filesystem<D, M> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<D, M> Default for Filesystem<D, M> {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(path: &NodePath, problem: PathProblem) -> FilesystemError {
    FilesystemError::InvalidPath {
        path: path.to_string(),
        problem,
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum FilesystemError {
    #[snafu(display("Path {} does not exist", path))]
    NotFound { path: String },
    #[snafu(display("Invalid path {}: {}", path, problem))]
    InvalidPath { path: String, problem: PathProblem },
}
