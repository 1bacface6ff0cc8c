//! The rooted tree and the path based operations that span it: lookup,
//! removal and moving.

mod filesystem;

pub use filesystem::{Filesystem, FilesystemError, PathProblem};
