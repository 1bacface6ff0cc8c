//! Structured paths and the resolution of relative paths against a working
//! directory.

mod node_path;
mod resolve;

pub use node_path::{NodePath, PathError, ROOT_MARKER};
pub use resolve::resolve;
