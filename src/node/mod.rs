//! Tree elements: directories owning a name-unique set of children, and
//! leaves carrying a payload plus change watchers.

mod node;
mod node_set;
mod render;
mod watcher;

pub use node::{Node, NodeError, NodeKind};
pub use node_set::{NodeSet, NodeSetError};
pub use render::TreeStyle;
pub use watcher::{Watcher, WatcherRegistry};
