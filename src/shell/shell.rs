use snafu::{Snafu, Whatever};
use tracing::{debug, info, warn};

use crate::config::ShellConfig;
use crate::ext::AsNodePath;
use crate::filesystem::{Filesystem, FilesystemError, PathProblem};
use crate::node::{Node, NodeError, NodeKind, NodeSetError, Watcher};
use crate::path::{NodePath, PathError, resolve};
use crate::shell::ManagedCd;

/// A working directory over a [`Filesystem`] plus path resolving commands.
///
/// Every path argument is resolved against the working directory first, so
/// the filesystem only ever sees absolute, normalized paths.
pub struct Shell<D, M = String> {
    filesystem: Filesystem<D, M>,
    cwd: Node<D, M>,
    config: ShellConfig,
}

impl<D, M> Shell<D, M> {
    /// A shell over a fresh, empty tree.
    pub fn new() -> Self {
        Self::with_filesystem(Filesystem::new())
    }

    /// A shell over an existing tree, starting at its root.
    pub fn with_filesystem(filesystem: Filesystem<D, M>) -> Self {
        let cwd = filesystem.root();
        Self {
            filesystem,
            cwd,
            config: ShellConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    pub fn filesystem(&self) -> &Filesystem<D, M> {
        &self.filesystem
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    fn attached_cwd(&self) -> Result<&Node<D, M>, ShellError> {
        if self.filesystem.contains(&self.cwd) {
            Ok(&self.cwd)
        } else {
            Err(invalid(
                &self.cwd.get_path(),
                PathProblem::DetachedWorkingDirectory,
            ))
        }
    }

    /// Absolute path of the working directory.
    ///
    /// Fails once the working directory, or one of its ancestors, has been
    /// removed from the tree.
    pub fn pwd(&self) -> Result<NodePath, ShellError> {
        Ok(self.attached_cwd()?.get_path())
    }

    /// Absolute, `.`/`..` collapsed form of `path`.
    pub fn resolve_path(&self, path: impl AsNodePath) -> Result<NodePath, ShellError> {
        let input = path.to_node_path().map_err(|err| {
            let shown = match err {
                PathError::EmptyPath => String::new(),
                PathError::NonUtf8Path { path } => path,
            };
            ShellError::InvalidPath {
                path: shown,
                problem: PathProblem::Malformed,
            }
        })?;

        if input.is_absolute() {
            return Ok(resolve(&NodePath::root(), &input));
        }
        Ok(resolve(&self.pwd()?, &input))
    }

    fn lookup(&self, path: &NodePath) -> Result<Node<D, M>, ShellError> {
        Ok(self.filesystem.get_node(path)?)
    }

    fn lookup_kind(&self, path: &NodePath, expected: NodeKind) -> Result<Node<D, M>, ShellError> {
        let node = self.lookup(path)?;
        if node.kind() != expected {
            return Err(ShellError::TypeMismatch {
                path: path.to_string(),
                expected,
            });
        }
        Ok(node)
    }

    fn lookup_directory(&self, path: &NodePath) -> Result<Node<D, M>, ShellError> {
        self.lookup_kind(path, NodeKind::Directory)
    }

    fn lookup_leaf(&self, path: &NodePath) -> Result<Node<D, M>, ShellError> {
        self.lookup_kind(path, NodeKind::Leaf)
    }

    /// The directory a new node at `path` would be created in.
    fn parent_directory(&self, path: &NodePath) -> Result<Node<D, M>, ShellError> {
        match self.filesystem.get_node(&path.parent()) {
            Ok(parent) if parent.is_directory() => Ok(parent),
            Ok(_) => Err(invalid(path, PathProblem::NotADirectory)),
            Err(FilesystemError::NotFound { .. }) => {
                Err(invalid(path, PathProblem::ParentNotFound))
            }
            Err(FilesystemError::InvalidPath { problem, .. }) => Err(invalid(path, problem)),
        }
    }

    pub fn cd(&mut self, path: impl AsNodePath) -> Result<(), ShellError> {
        let path = self.resolve_path(path)?;
        self.cwd = self.lookup_directory(&path)?;
        debug!("Changed working directory to {}", path);
        Ok(())
    }

    /// Changes into `path` until the returned guard is dropped.
    pub fn managed_cd(&mut self, path: impl AsNodePath) -> Result<ManagedCd<'_, D, M>, ShellError> {
        let previous = self.pwd()?;
        self.cd(path)?;
        Ok(ManagedCd::new(self, previous))
    }

    /// Runs `f` with `path` as working directory and changes back afterwards,
    /// whether or not `f` succeeded. An error from `f` takes precedence over
    /// a failure to change back.
    pub fn in_dir<T>(
        &mut self,
        path: impl AsNodePath,
        f: impl FnOnce(&mut Self) -> Result<T, ShellError>,
    ) -> Result<T, ShellError> {
        let mut guard = self.managed_cd(path)?;
        let result = f(&mut *guard);
        let restored = guard.finish();
        let value = result?;
        restored?;
        Ok(value)
    }

    /// Sorted, indented listing of the directory at `path` and everything
    /// below it.
    pub fn tree(&self, path: impl AsNodePath) -> Result<String, ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup_directory(&path)?
            .tree_repr(&self.config.tree_style)
            .map_err(|err| node_error(&path, err))
    }

    /// Sorted names of the children of the directory at `path`.
    pub fn ls(&self, path: impl AsNodePath) -> Result<Vec<String>, ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup_directory(&path)?
            .child_names()
            .map_err(|err| node_error(&path, err))
    }

    /// Creates a directory. With `parents`, every missing directory along
    /// the way is created too and an existing directory at `path` is fine.
    pub fn mkdir(
        &mut self,
        path: impl AsNodePath,
        parents: bool,
    ) -> Result<Node<D, M>, ShellError> {
        let path = self.resolve_path(path)?;
        let Some(name) = path.name() else {
            return Err(invalid(&path, PathProblem::NamelessPath));
        };

        if !parents {
            let parent = self.parent_directory(&path)?;
            let created = Node::new_directory(name, Some(&parent))
                .map_err(|err| creation_error(&path, err))?;
            info!("Created directory {}", path);
            return Ok(created);
        }

        let mut node = self.filesystem.root();
        for part in path.parts() {
            node = match node.get_child(part) {
                Ok(child) if child.is_directory() => child,
                Ok(_) => return Err(invalid(&path, PathProblem::NotADirectory)),
                Err(_) => {
                    let created = Node::new_directory(part.as_str(), Some(&node))
                        .map_err(|err| creation_error(&path, err))?;
                    debug!("Created intermediate directory {}", created.get_path());
                    created
                }
            };
        }
        info!("Ensured directory {}", path);
        Ok(node)
    }

    pub fn mv(
        &mut self,
        source: impl AsNodePath,
        target: impl AsNodePath,
    ) -> Result<(), ShellError> {
        let source = self.resolve_path(source)?;
        let target = self.resolve_path(target)?;
        Ok(self.filesystem.move_node(&source, &target)?)
    }

    /// Creates an empty leaf.
    pub fn touch(&mut self, path: impl AsNodePath) -> Result<Node<D, M>, ShellError> {
        self.create_leaf(path, None)
    }

    /// Creates a leaf that starts out holding `data`.
    pub fn touch_with(&mut self, path: impl AsNodePath, data: D) -> Result<Node<D, M>, ShellError> {
        self.create_leaf(path, Some(data))
    }

    fn create_leaf(
        &mut self,
        path: impl AsNodePath,
        data: Option<D>,
    ) -> Result<Node<D, M>, ShellError> {
        let path = self.resolve_path(path)?;
        let Some(name) = path.name() else {
            return Err(invalid(&path, PathProblem::NamelessPath));
        };

        let parent = self.parent_directory(&path)?;
        let created =
            Node::new_leaf(name, Some(&parent), data).map_err(|err| creation_error(&path, err))?;
        info!("Created leaf {}", path);
        Ok(created)
    }

    /// Detaches the node at `path` and returns it. Directories need
    /// `recursive`; the root can never be removed.
    pub fn rm(&mut self, path: impl AsNodePath, recursive: bool) -> Result<Node<D, M>, ShellError> {
        let path = self.resolve_path(path)?;
        let node = self.lookup(&path)?;

        if node == self.filesystem.root() {
            return Err(invalid(&path, PathProblem::RootForbidden));
        }
        if node.is_directory() && !recursive {
            return Err(invalid(&path, PathProblem::RecursiveRequired));
        }

        let removed = self.filesystem.remove_node(&path)?;
        if !self.filesystem.contains(&self.cwd) {
            warn!(
                "Working directory was removed along with {}; cd to an absolute path to recover",
                path
            );
        }
        Ok(removed)
    }

    /// Replaces the payload of the leaf at `path` and notifies its watchers.
    ///
    /// A failing watcher is reported after the payload has been stored; any
    /// watchers after it are not called.
    pub fn set_data(&mut self, path: impl AsNodePath, data: D) -> Result<(), ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup_leaf(&path)?
            .set_data(data)
            .map_err(|err| node_error(&path, err))
    }

    /// Empties the payload of the leaf at `path` and notifies its watchers.
    pub fn clear_data(&mut self, path: impl AsNodePath) -> Result<(), ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup_leaf(&path)?
            .clear_data()
            .map_err(|err| node_error(&path, err))
    }

    /// Returns the previous value stored under `key`, if any.
    pub fn set_metadata(
        &mut self,
        path: impl AsNodePath,
        key: impl Into<String>,
        value: M,
    ) -> Result<Option<M>, ShellError> {
        let path = self.resolve_path(path)?;
        Ok(self.lookup(&path)?.set_metadata(key, value))
    }

    pub fn del_metadata(&mut self, path: impl AsNodePath, key: &str) -> Result<M, ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup(&path)?
            .del_metadata(key)
            .map_err(|err| node_error(&path, err))
    }

    /// Registers `watcher` on the leaf at `path`. Returns `false` if it was
    /// already registered there.
    pub fn watch_file(
        &mut self,
        path: impl AsNodePath,
        watcher: Watcher,
    ) -> Result<bool, ShellError> {
        let path = self.resolve_path(path)?;
        let registered = self
            .lookup_leaf(&path)?
            .watch(watcher)
            .map_err(|err| node_error(&path, err))?;
        debug!("Watching {}", path);
        Ok(registered)
    }

    /// Unregisters `watchers` from the leaf at `path`, or all of its watchers
    /// when `watchers` is empty. Returns how many were removed.
    pub fn unwatch_file(
        &mut self,
        path: impl AsNodePath,
        watchers: &[Watcher],
    ) -> Result<usize, ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup_leaf(&path)?
            .unwatch(watchers)
            .map_err(|err| node_error(&path, err))
    }
}

impl<D: Clone, M> Shell<D, M> {
    pub fn get_data(&self, path: impl AsNodePath) -> Result<Option<D>, ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup_leaf(&path)?
            .data()
            .map_err(|err| node_error(&path, err))
    }
}

impl<D, M: Clone> Shell<D, M> {
    pub fn get_metadata(&self, path: impl AsNodePath, key: &str) -> Result<M, ShellError> {
        let path = self.resolve_path(path)?;
        self.lookup(&path)?
            .get_metadata(key)
            .map_err(|err| node_error(&path, err))
    }
}

impl<D, M> Default for Shell<D, M> {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(path: &NodePath, problem: PathProblem) -> ShellError {
    ShellError::InvalidPath {
        path: path.to_string(),
        problem,
    }
}

fn creation_error(path: &NodePath, err: NodeError) -> ShellError {
    match err {
        NodeError::Membership {
            source: NodeSetError::DuplicateName { .. },
            ..
        } => invalid(path, PathProblem::AlreadyExists),
        other => node_error(path, other),
    }
}

fn node_error(path: &NodePath, err: NodeError) -> ShellError {
    match err {
        NodeError::NotADirectory { .. } => ShellError::TypeMismatch {
            path: path.to_string(),
            expected: NodeKind::Directory,
        },
        NodeError::NotALeaf { .. } => ShellError::TypeMismatch {
            path: path.to_string(),
            expected: NodeKind::Leaf,
        },
        NodeError::MissingKey { key, .. } => ShellError::MissingKey {
            path: path.to_string(),
            key,
        },
        NodeError::WatcherFailed { source, .. } => ShellError::WatcherFailed {
            path: path.to_string(),
            source,
        },
        other => invalid(path, PathProblem::from_node_error(&other)),
    }
}

#[derive(Debug, Snafu)]
pub enum ShellError {
    #[snafu(display("Invalid path {}: {}", path, problem))]
    InvalidPath { path: String, problem: PathProblem },
    #[snafu(display("{} is not a {}", path, expected))]
    TypeMismatch { path: String, expected: NodeKind },
    #[snafu(display("No metadata '{}' for {}", key, path))]
    MissingKey { path: String, key: String },
    #[snafu(display("A watcher of {} failed", path))]
    WatcherFailed { path: String, source: Whatever },
}

impl ShellError {
    /// The path problem, for [`ShellError::InvalidPath`].
    pub fn problem(&self) -> Option<PathProblem> {
        match self {
            ShellError::InvalidPath { problem, .. } => Some(*problem),
            _ => None,
        }
    }
}

impl From<FilesystemError> for ShellError {
    fn from(err: FilesystemError) -> Self {
        match err {
            FilesystemError::NotFound { path } => ShellError::InvalidPath {
                path,
                problem: PathProblem::NotFound,
            },
            FilesystemError::InvalidPath { path, problem } => {
                ShellError::InvalidPath { path, problem }
            }
        }
    }
}
