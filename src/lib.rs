#![allow(clippy::enum_variant_names)]
#![allow(clippy::module_inception)]

//! An in-memory hierarchical namespace: directories and data-carrying leaves
//! addressed by `/`-separated paths, plus a [`Shell`] that keeps a working
//! directory and offers `cd`, `ls`, `mkdir`, `mv`, `touch`, `rm` style
//! commands on top of it.

pub mod config;
pub mod ext;
pub mod filesystem;
pub mod node;
pub mod path;
pub mod shell;

pub use config::{ConfigError, LogLevel, ShellConfig, setup_tracing};
pub use ext::AsNodePath;
pub use filesystem::{Filesystem, FilesystemError, PathProblem};
pub use node::{Node, NodeError, NodeKind, Watcher};
pub use path::{NodePath, PathError};
pub use shell::{ManagedCd, Shell, ShellError};
