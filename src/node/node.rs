use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use derive_more::Display;
use hashlink::LinkedHashMap;
use snafu::{ResultExt, Snafu, Whatever};
use tracing::debug;

use crate::node::render::{TreeStyle, render_tree};
use crate::node::{NodeSet, NodeSetError, Watcher, WatcherRegistry};
use crate::path::{NodePath, ROOT_MARKER};

type Link<D, M> = Rc<RefCell<NodeInner<D, M>>>;
type WeakLink<D, M> = Weak<RefCell<NodeInner<D, M>>>;

/// The two kinds of tree elements.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    #[display("directory")]
    Directory,
    #[display("leaf")]
    Leaf,
}

/// Handle to a directory or leaf in a tree.
///
/// Cloning a handle is cheap and yields another reference to the same node.
/// Handles compare by identity. A directory owns its children; the link back
/// to the parent is weak, so dropping the last handle to a detached subtree
/// frees it.
pub struct Node<D, M> {
    link: Link<D, M>,
}

struct NodeInner<D, M> {
    name: String,
    is_root: bool,
    parent: Option<WeakLink<D, M>>,
    metadata: LinkedHashMap<String, M>,
    body: NodeBody<D, M>,
}

enum NodeBody<D, M> {
    Directory(NodeSet<D, M>),
    Leaf(LeafBody<D>),
}

struct LeafBody<D> {
    data: Option<D>,
    watchers: WatcherRegistry,
}

impl<D, M> Node<D, M> {
    /// Creates a parentless directory named after the root marker.
    pub fn root() -> Self {
        Self::from_inner(ROOT_MARKER.to_string(), true, NodeBody::Directory(NodeSet::default()))
    }

    pub fn new_directory(
        name: impl Into<String>,
        parent: Option<&Node<D, M>>,
    ) -> Result<Self, NodeError> {
        Self::create(name.into(), NodeBody::Directory(NodeSet::default()), parent)
    }

    pub fn new_leaf(
        name: impl Into<String>,
        parent: Option<&Node<D, M>>,
        data: Option<D>,
    ) -> Result<Self, NodeError> {
        let body = NodeBody::Leaf(LeafBody {
            data,
            watchers: WatcherRegistry::default(),
        });
        Self::create(name.into(), body, parent)
    }

    fn create(
        name: String,
        body: NodeBody<D, M>,
        parent: Option<&Node<D, M>>,
    ) -> Result<Self, NodeError> {
        validate_name(&name)?;
        let node = Self::from_inner(name, false, body);
        if let Some(parent) = parent {
            node.set_parent(Some(parent))?;
        }
        Ok(node)
    }

    fn from_inner(name: String, is_root: bool, body: NodeBody<D, M>) -> Self {
        Self {
            link: Rc::new(RefCell::new(NodeInner {
                name,
                is_root,
                parent: None,
                metadata: LinkedHashMap::new(),
                body,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.link.borrow().name.clone()
    }

    pub fn kind(&self) -> NodeKind {
        match self.link.borrow().body {
            NodeBody::Directory(_) => NodeKind::Directory,
            NodeBody::Leaf(_) => NodeKind::Leaf,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind() == NodeKind::Directory
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Leaf
    }

    /// Whether this node was created as the root of a tree.
    pub fn is_root(&self) -> bool {
        self.link.borrow().is_root
    }

    pub fn parent(&self) -> Option<Node<D, M>> {
        self.link
            .borrow()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|link| Node { link })
    }

    /// Parent, grandparent, ... up to the topmost node.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<D, M>> {
        std::iter::successors(self.parent(), Node::parent)
    }

    /// The topmost node reachable through parent links.
    pub fn top(&self) -> Node<D, M> {
        self.ancestors().last().unwrap_or_else(|| self.clone())
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn is_ancestor_or_self_of(&self, other: &Node<D, M>) -> bool {
        self == other || other.ancestors().any(|ancestor| &ancestor == self)
    }

    /// Absolute path from the root to this node.
    ///
    /// A node that is not attached below a root yields a relative path that
    /// starts at its topmost detached ancestor, so a freshly detached node
    /// answers with just its own name.
    pub fn get_path(&self) -> NodePath {
        let mut names = vec![self.name()];
        let mut top = self.clone();
        while let Some(parent) = top.parent() {
            names.push(parent.name());
            top = parent;
        }
        names.reverse();

        if top.is_root() {
            NodePath::from_parts(true, names.into_iter().skip(1))
        } else {
            NodePath::from_parts(false, names)
        }
    }

    /// Detaches from the current parent and attaches under `new_parent`.
    ///
    /// All preconditions are checked before anything changes: on error the
    /// node keeps its previous parent. Re-attaching to the current parent is
    /// allowed.
    pub fn set_parent(&self, new_parent: Option<&Node<D, M>>) -> Result<(), NodeError> {
        let name = self.name();
        if let Some(parent) = new_parent {
            self.check_attachable(parent, &name)?;
        }

        self.detach()?;
        if let Some(parent) = new_parent {
            parent.attach(self)?;
        }
        Ok(())
    }

    /// Changes the name, re-keying the owning directory if there is one.
    pub fn rename(&self, new_name: impl Into<String>) -> Result<(), NodeError> {
        let new_name = new_name.into();
        validate_name(&new_name)?;
        if self.name() == new_name {
            return Ok(());
        }

        match self.parent() {
            Some(parent) => self.move_to(&parent, Some(&new_name)),
            None => {
                self.link.borrow_mut().name = new_name;
                Ok(())
            }
        }
    }

    /// Moves under `new_parent`, optionally taking `new_name` on the way.
    ///
    /// The rename and the reparent happen together or not at all.
    pub fn move_to(
        &self,
        new_parent: &Node<D, M>,
        new_name: Option<&str>,
    ) -> Result<(), NodeError> {
        let old_name = self.name();
        let target_name = new_name.map_or_else(|| old_name.clone(), str::to_string);
        validate_name(&target_name)?;
        self.check_attachable(new_parent, &target_name)?;

        let old_parent = self.parent();
        self.detach()?;
        self.link.borrow_mut().name = target_name;

        if let Err(err) = new_parent.attach(self) {
            self.link.borrow_mut().name = old_name;
            if let Some(old_parent) = old_parent {
                old_parent.attach(self)?;
            }
            return Err(err);
        }
        Ok(())
    }

    fn check_attachable(&self, parent: &Node<D, M>, name: &str) -> Result<(), NodeError> {
        if self.is_root() {
            return Err(NodeError::RootNotAttachable {
                parent: parent.name(),
            });
        }

        if !parent.is_directory() {
            return Err(NodeError::NotADirectory {
                name: parent.name(),
            });
        }

        if self.is_ancestor_or_self_of(parent) {
            return Err(NodeError::Cycle {
                name: self.name(),
                parent: parent.name(),
            });
        }

        let occupant = parent.with_children(|children| children.get(name).ok().cloned())?;
        match occupant {
            Some(occupant) if occupant != *self => Err(NodeError::Membership {
                directory: parent.name(),
                source: NodeSetError::DuplicateName {
                    name: name.to_string(),
                },
            }),
            _ => Ok(()),
        }
    }

    fn detach(&self) -> Result<(), NodeError> {
        let Some(parent) = self.parent() else {
            self.link.borrow_mut().parent = None;
            return Ok(());
        };

        let name = self.name();
        parent
            .with_children_mut(|children| children.remove(&name))?
            .context(MembershipSnafu {
                directory: parent.name(),
            })?;
        self.link.borrow_mut().parent = None;
        Ok(())
    }

    fn attach(&self, child: &Node<D, M>) -> Result<(), NodeError> {
        self.with_children_mut(|children| children.add(child.clone()))?
            .context(MembershipSnafu {
                directory: self.name(),
            })?;
        child.link.borrow_mut().parent = Some(Rc::downgrade(&self.link));
        Ok(())
    }

    fn with_children<R>(&self, f: impl FnOnce(&NodeSet<D, M>) -> R) -> Result<R, NodeError> {
        match &self.link.borrow().body {
            NodeBody::Directory(children) => Ok(f(children)),
            NodeBody::Leaf(_) => Err(NodeError::NotADirectory { name: self.name() }),
        }
    }

    fn with_children_mut<R>(
        &self,
        f: impl FnOnce(&mut NodeSet<D, M>) -> R,
    ) -> Result<R, NodeError> {
        let mut guard = self.link.borrow_mut();
        let inner = &mut *guard;
        match &mut inner.body {
            NodeBody::Directory(children) => Ok(f(children)),
            NodeBody::Leaf(_) => Err(NodeError::NotADirectory {
                name: inner.name.clone(),
            }),
        }
    }

    /// Takes ownership of `child`, detaching it from its previous parent.
    pub fn add_child(&self, child: &Node<D, M>) -> Result<(), NodeError> {
        child.set_parent(Some(self))
    }

    /// Detaches the named child and hands it to the caller.
    pub fn remove_child(&self, name: &str) -> Result<Node<D, M>, NodeError> {
        let child = self.get_child(name)?;
        child.set_parent(None)?;
        Ok(child)
    }

    pub fn get_child(&self, name: &str) -> Result<Node<D, M>, NodeError> {
        self.with_children(|children| children.get(name).cloned())?
            .context(MembershipSnafu {
                directory: self.name(),
            })
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.with_children(|children| children.contains_name(name))
            .unwrap_or(false)
    }

    pub fn children(&self) -> Result<Vec<Node<D, M>>, NodeError> {
        self.with_children(|children| children.iter().cloned().collect())
    }

    /// Child names sorted lexicographically.
    pub fn child_names(&self) -> Result<Vec<String>, NodeError> {
        let mut names = self.with_children(|children| {
            children.names().map(str::to_string).collect::<Vec<_>>()
        })?;
        names.sort();
        Ok(names)
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: M) -> Option<M> {
        self.link.borrow_mut().metadata.insert(key.into(), value)
    }

    pub fn del_metadata(&self, key: &str) -> Result<M, NodeError> {
        let removed = self.link.borrow_mut().metadata.remove(key);
        removed.ok_or_else(|| NodeError::MissingKey {
            name: self.name(),
            key: key.to_string(),
        })
    }

    /// Metadata keys in insertion order.
    pub fn metadata_keys(&self) -> Vec<String> {
        self.link.borrow().metadata.keys().cloned().collect()
    }

    fn with_leaf<R>(&self, f: impl FnOnce(&LeafBody<D>) -> R) -> Result<R, NodeError> {
        match &self.link.borrow().body {
            NodeBody::Leaf(leaf) => Ok(f(leaf)),
            NodeBody::Directory(_) => Err(NodeError::NotALeaf { name: self.name() }),
        }
    }

    fn with_leaf_mut<R>(&self, f: impl FnOnce(&mut LeafBody<D>) -> R) -> Result<R, NodeError> {
        let mut guard = self.link.borrow_mut();
        let inner = &mut *guard;
        match &mut inner.body {
            NodeBody::Leaf(leaf) => Ok(f(leaf)),
            NodeBody::Directory(_) => Err(NodeError::NotALeaf {
                name: inner.name.clone(),
            }),
        }
    }

    /// Replaces the payload and notifies the watchers.
    ///
    /// The payload is stored before any watcher runs. If a watcher fails, the
    /// remaining ones are skipped and the new payload stays in place.
    pub fn set_data(&self, data: D) -> Result<(), NodeError> {
        self.with_leaf_mut(|leaf| leaf.data = Some(data))?;
        self.notify_watchers()
    }

    /// Resets the payload to empty and notifies the watchers.
    pub fn clear_data(&self) -> Result<(), NodeError> {
        self.with_leaf_mut(|leaf| leaf.data = None)?;
        self.notify_watchers()
    }

    pub fn has_data(&self) -> Result<bool, NodeError> {
        self.with_leaf(|leaf| leaf.data.is_some())
    }

    /// Registers a watcher. Returns `false` if it was already registered.
    pub fn watch(&self, watcher: Watcher) -> Result<bool, NodeError> {
        self.with_leaf_mut(|leaf| leaf.watchers.register(watcher))
    }

    /// Unregisters the given watchers, or every watcher if none are given.
    /// Returns how many were removed.
    pub fn unwatch(&self, watchers: &[Watcher]) -> Result<usize, NodeError> {
        self.with_leaf_mut(|leaf| {
            if watchers.is_empty() {
                let removed = leaf.watchers.len();
                leaf.watchers.clear();
                return removed;
            }

            watchers
                .iter()
                .filter(|watcher| {
                    let removed = leaf.watchers.unregister(watcher);
                    if !removed {
                        debug!("Ignoring unregistered watcher {:?}", watcher);
                    }
                    removed
                })
                .count()
        })
    }

    pub fn watcher_count(&self) -> Result<usize, NodeError> {
        self.with_leaf(|leaf| leaf.watchers.len())
    }

    fn notify_watchers(&self) -> Result<(), NodeError> {
        let watchers = self.with_leaf(|leaf| leaf.watchers.snapshot())?;
        if watchers.is_empty() {
            return Ok(());
        }

        let path = self.get_path();
        debug!("Notifying {} watcher(s) of {}", watchers.len(), path);
        for watcher in watchers {
            watcher.notify(&path).context(WatcherFailedSnafu {
                path: path.to_string(),
            })?;
        }
        Ok(())
    }

    /// Indented listing of this directory and everything below it, sorted by
    /// name.
    pub fn tree_repr(&self, style: &TreeStyle) -> Result<String, NodeError> {
        if !self.is_directory() {
            return Err(NodeError::NotADirectory { name: self.name() });
        }
        Ok(render_tree(self, style))
    }
}

impl<D: Clone, M> Node<D, M> {
    pub fn data(&self) -> Result<Option<D>, NodeError> {
        self.with_leaf(|leaf| leaf.data.clone())
    }
}

impl<D, M: Clone> Node<D, M> {
    pub fn get_metadata(&self, key: &str) -> Result<M, NodeError> {
        let value = self.link.borrow().metadata.get(key).cloned();
        value.ok_or_else(|| NodeError::MissingKey {
            name: self.name(),
            key: key.to_string(),
        })
    }
}

impl<D, M> Clone for Node<D, M> {
    fn clone(&self) -> Self {
        Self {
            link: self.link.clone(),
        }
    }
}

impl<D, M> PartialEq for Node<D, M> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.link, &other.link)
    }
}

impl<D, M> Eq for Node<D, M> {}

impl<D, M> fmt::Debug for Node<D, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.link.try_borrow() {
            Ok(inner) => {
                let kind = match inner.body {
                    NodeBody::Directory(_) => NodeKind::Directory,
                    NodeBody::Leaf(_) => NodeKind::Leaf,
                };
                f.debug_struct("Node")
                    .field("name", &inner.name)
                    .field("kind", &kind)
                    .finish()
            }
            Err(_) => f.write_str("Node(<borrowed>)"),
        }
    }
}

fn validate_name(name: &str) -> Result<(), NodeError> {
    let reserved = name.is_empty() || name == "." || name == ".." || name.contains('/');
    if reserved {
        return Err(NodeError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Snafu)]
pub enum NodeError {
    #[snafu(display("'{}' is not a valid node name", name))]
    InvalidName { name: String },
    #[snafu(display("Children of '{}' rejected the change", directory))]
    Membership {
        directory: String,
        source: NodeSetError,
    },
    #[snafu(display("'{}' is not a directory", name))]
    NotADirectory { name: String },
    #[snafu(display("'{}' is not a leaf", name))]
    NotALeaf { name: String },
    #[snafu(display("Moving '{}' below '{}' would create a cycle", name, parent))]
    Cycle { name: String, parent: String },
    #[snafu(display("A root cannot be placed below '{}'", parent))]
    RootNotAttachable { parent: String },
    #[snafu(display("No metadata '{}' on '{}'", key, name))]
    MissingKey { name: String, key: String },
    #[snafu(display("A watcher of {} failed", path))]
    WatcherFailed { path: String, source: Whatever },
}

#[cfg(test)]
mod tests {
    use super::*;
    use snafu::whatever;
    use std::cell::Cell;

    type TestNode = Node<i32, String>;

    fn dir(name: &str, parent: &TestNode) -> TestNode {
        Node::new_directory(name, Some(parent)).unwrap()
    }

    fn leaf(name: &str, parent: &TestNode) -> TestNode {
        Node::new_leaf(name, Some(parent), None).unwrap()
    }

    #[test]
    fn creating_with_a_parent_registers_the_child() {
        let root = TestNode::root();
        let a = dir("a", &root);

        assert_eq!(root.get_child("a").unwrap(), a);
        assert_eq!(a.parent(), Some(root.clone()));
        assert_eq!(a.get_path().to_string(), "/a");
    }

    #[test]
    fn duplicate_sibling_names_are_rejected() {
        let root = TestNode::root();
        dir("a", &root);

        let result = Node::<i32, String>::new_leaf("a", Some(&root), None);
        assert!(matches!(
            result,
            Err(NodeError::Membership {
                source: NodeSetError::DuplicateName { .. },
                ..
            })
        ));
        assert_eq!(root.child_names().unwrap(), vec!["a"]);
    }

    #[test]
    fn reserved_names_are_rejected() {
        for name in ["", ".", "..", "a/b"] {
            assert!(matches!(
                TestNode::new_directory(name, None),
                Err(NodeError::InvalidName { .. })
            ));
        }
    }

    #[test]
    fn reparenting_moves_between_directories() {
        let root = TestNode::root();
        let a = dir("a", &root);
        let b = dir("b", &root);
        let f = leaf("f", &a);

        f.set_parent(Some(&b)).unwrap();

        assert!(!a.has_child("f"));
        assert_eq!(b.get_child("f").unwrap(), f);
        assert_eq!(f.get_path().to_string(), "/b/f");
    }

    #[test]
    fn failed_reparent_keeps_the_old_parent() {
        let root = TestNode::root();
        let a = dir("a", &root);
        let b = dir("b", &root);
        let f = leaf("f", &a);
        leaf("f", &b);

        let result = f.set_parent(Some(&b));

        assert!(matches!(result, Err(NodeError::Membership { .. })));
        assert_eq!(f.parent(), Some(a.clone()));
        assert_eq!(a.get_child("f").unwrap(), f);
    }

    #[test]
    fn reparenting_to_the_same_parent_is_a_no_op() {
        let root = TestNode::root();
        let a = dir("a", &root);

        a.set_parent(Some(&root)).unwrap();

        assert_eq!(root.child_names().unwrap(), vec!["a"]);
        assert_eq!(a.parent(), Some(root));
    }

    #[test]
    fn clearing_the_parent_of_a_parentless_node_is_a_no_op() {
        let lonely = TestNode::new_directory("lonely", None).unwrap();
        lonely.set_parent(None).unwrap();
        assert_eq!(lonely.parent(), None);
    }

    #[test]
    fn leaves_cannot_adopt_children() {
        let root = TestNode::root();
        let f = leaf("f", &root);

        let result = TestNode::new_directory("d", Some(&f));
        assert!(matches!(result, Err(NodeError::NotADirectory { .. })));
    }

    #[test]
    fn cycles_are_rejected() {
        let root = TestNode::root();
        let a = dir("a", &root);
        let b = dir("b", &a);

        assert!(matches!(a.set_parent(Some(&b)), Err(NodeError::Cycle { .. })));
        assert!(matches!(a.set_parent(Some(&a)), Err(NodeError::Cycle { .. })));
        assert_eq!(a.parent(), Some(root));
    }

    #[test]
    fn roots_cannot_be_attached_below_a_directory() {
        let root = TestNode::root();
        let a = dir("a", &root);
        let other_root = TestNode::root();
        let b = dir("b", &other_root);

        assert!(matches!(
            other_root.set_parent(Some(&a)),
            Err(NodeError::RootNotAttachable { .. })
        ));
        assert!(matches!(
            other_root.move_to(&a, Some("mounted")),
            Err(NodeError::RootNotAttachable { .. })
        ));
        assert!(a.child_names().unwrap().is_empty());
        assert_eq!(other_root.parent(), None);
        assert_eq!(b.get_path().to_string(), "/b");
    }

    #[test]
    fn detached_nodes_have_relative_paths() {
        let root = TestNode::root();
        let a = dir("a", &root);
        let f = leaf("f", &a);

        let removed = root.remove_child("a").unwrap();

        assert_eq!(removed, a);
        assert_eq!(a.parent(), None);
        assert!(!a.get_path().is_absolute());
        assert_eq!(a.get_path().to_string(), "a");
        assert_eq!(f.get_path().to_string(), "a/f");
        assert_eq!(root.get_path().to_string(), "/");
    }

    #[test]
    fn rename_rekeys_the_parent() {
        let root = TestNode::root();
        let a = dir("a", &root);

        a.rename("z").unwrap();

        assert_eq!(root.child_names().unwrap(), vec!["z"]);
        assert_eq!(root.get_child("z").unwrap(), a);
        assert!(root.get_child("a").is_err());
    }

    #[test]
    fn rename_onto_a_sibling_fails_without_changes() {
        let root = TestNode::root();
        let a = dir("a", &root);
        dir("b", &root);

        assert!(a.rename("b").is_err());
        assert_eq!(a.name(), "a");
        assert_eq!(root.child_names().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn move_to_with_a_colliding_name_changes_nothing() {
        let root = TestNode::root();
        let src = dir("src", &root);
        let dst = dir("dst", &root);
        leaf("taken", &dst);

        let result = src.move_to(&dst, Some("taken"));

        assert!(result.is_err());
        assert_eq!(src.name(), "src");
        assert_eq!(src.parent(), Some(root));
    }

    #[test]
    fn move_to_renames_and_reparents() {
        let root = TestNode::root();
        let src = dir("src", &root);
        let dst = dir("dst", &root);

        src.move_to(&dst, Some("renamed")).unwrap();

        assert_eq!(src.get_path().to_string(), "/dst/renamed");
        assert_eq!(root.child_names().unwrap(), vec!["dst"]);
    }

    #[test]
    fn metadata_is_a_per_node_side_table() {
        let root = TestNode::root();
        let a = dir("a", &root);

        assert_eq!(a.set_metadata("owner", "me".to_string()), None);
        assert_eq!(a.get_metadata("owner").unwrap(), "me");
        assert_eq!(a.metadata_keys(), vec!["owner"]);
        assert_eq!(a.del_metadata("owner").unwrap(), "me");
        assert!(matches!(
            a.get_metadata("owner"),
            Err(NodeError::MissingKey { .. })
        ));
        assert!(matches!(
            a.del_metadata("owner"),
            Err(NodeError::MissingKey { .. })
        ));
    }

    #[test]
    fn data_only_lives_on_leaves() {
        let root = TestNode::root();
        let f = leaf("f", &root);

        assert_eq!(f.data().unwrap(), None);
        f.set_data(7).unwrap();
        assert_eq!(f.data().unwrap(), Some(7));
        f.clear_data().unwrap();
        assert_eq!(f.data().unwrap(), None);

        assert!(matches!(root.data(), Err(NodeError::NotALeaf { .. })));
        assert!(matches!(root.set_data(1), Err(NodeError::NotALeaf { .. })));
    }

    #[test]
    fn watchers_fire_on_set_and_clear() {
        let root = TestNode::root();
        let f = leaf("f", &root);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        f.watch(Watcher::new(move |path| sink.borrow_mut().push(path.to_string())))
            .unwrap();

        f.set_data(1).unwrap();
        f.clear_data().unwrap();

        assert_eq!(*seen.borrow(), vec!["/f", "/f"]);
    }

    #[test]
    fn a_failing_watcher_propagates_after_the_write() {
        let root = TestNode::root();
        let f = leaf("f", &root);
        let later = Rc::new(Cell::new(0));
        let counter = later.clone();
        f.watch(Watcher::fallible(|path| whatever!("refusing {}", path)))
            .unwrap();
        f.watch(Watcher::new(move |_| counter.set(counter.get() + 1)))
            .unwrap();

        let result = f.set_data(5);

        assert!(matches!(result, Err(NodeError::WatcherFailed { .. })));
        assert_eq!(f.data().unwrap(), Some(5));
        assert_eq!(later.get(), 0);
    }

    #[test]
    fn a_watcher_may_unregister_itself_while_firing() {
        let root = TestNode::root();
        let f = leaf("f", &root);
        let calls = Rc::new(Cell::new(0));

        let handle = f.clone();
        let counter = calls.clone();
        let slot: Rc<RefCell<Option<Watcher>>> = Rc::new(RefCell::new(None));
        let own = slot.clone();
        let watcher = Watcher::new(move |_| {
            counter.set(counter.get() + 1);
            if let Some(me) = own.borrow().as_ref() {
                handle.unwatch(std::slice::from_ref(me)).unwrap();
            }
        });
        *slot.borrow_mut() = Some(watcher.clone());
        f.watch(watcher).unwrap();

        f.set_data(1).unwrap();
        f.set_data(2).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(f.watcher_count().unwrap(), 0);
    }

    #[test]
    fn unwatch_without_arguments_clears_everything() {
        let root = TestNode::root();
        let f = leaf("f", &root);
        let kept = Watcher::new(|_| {});
        f.watch(kept.clone()).unwrap();
        f.watch(Watcher::new(|_| {})).unwrap();

        assert_eq!(f.unwatch(&[Watcher::new(|_| {})]).unwrap(), 0);
        assert_eq!(f.unwatch(&[kept]).unwrap(), 1);
        assert_eq!(f.unwatch(&[]).unwrap(), 1);
        assert_eq!(f.watcher_count().unwrap(), 0);
    }
}
