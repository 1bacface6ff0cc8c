use std::collections::HashMap;

use snafu::Snafu;

use crate::node::Node;

/// The children of one directory, unique by name.
///
/// Members are keyed by the name they had when inserted. Renaming a member
/// goes through [`Node::rename`], which re-keys the owning set, so the key
/// and the member's name always agree.
#[derive(Debug)]
pub struct NodeSet<D, M> {
    members: HashMap<String, Node<D, M>>,
}

impl<D, M> Default for NodeSet<D, M> {
    fn default() -> Self {
        Self {
            members: HashMap::new(),
        }
    }
}

impl<D, M> NodeSet<D, M> {
    pub fn add(&mut self, node: Node<D, M>) -> Result<(), NodeSetError> {
        let name = node.name();
        if self.members.contains_key(&name) {
            return Err(NodeSetError::DuplicateName { name });
        }

        self.members.insert(name, node);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Node<D, M>, NodeSetError> {
        self.members.get(name).ok_or_else(|| NodeSetError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn remove(&mut self, name: &str) -> Result<Node<D, M>, NodeSetError> {
        self.members
            .remove(name)
            .ok_or_else(|| NodeSetError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Membership by name, as the name is the identity inside a set.
    pub fn contains(&self, node: &Node<D, M>) -> bool {
        self.contains_name(&node.name())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iteration order is unspecified. Sort explicitly for presentation.
    pub fn iter(&self) -> impl Iterator<Item = &Node<D, M>> {
        self.members.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum NodeSetError {
    #[snafu(display("A node named '{}' already exists", name))]
    DuplicateName { name: String },
    #[snafu(display("No node named '{}'", name))]
    NotFound { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestNode = Node<u32, String>;

    fn detached_leaf(name: &str) -> TestNode {
        Node::new_leaf(name, None, None).unwrap()
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut set = NodeSet::default();
        set.add(detached_leaf("a")).unwrap();

        let result = set.add(detached_leaf("a"));
        assert_eq!(
            result,
            Err(NodeSetError::DuplicateName {
                name: "a".to_string()
            })
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn get_and_remove_fail_for_missing_names() {
        let mut set: NodeSet<u32, String> = NodeSet::default();

        assert!(matches!(set.get("x"), Err(NodeSetError::NotFound { .. })));
        assert!(matches!(set.remove("x"), Err(NodeSetError::NotFound { .. })));
    }

    #[test]
    fn membership_by_name_and_by_node() {
        let mut set = NodeSet::default();
        let member = detached_leaf("member");
        set.add(member.clone()).unwrap();

        assert!(set.contains_name("member"));
        assert!(set.contains(&member));
        assert!(set.contains(&detached_leaf("member")));
        assert!(!set.contains(&detached_leaf("other")));
    }

    #[test]
    fn remove_returns_the_stored_member() {
        let mut set = NodeSet::default();
        let member = detached_leaf("m");
        set.add(member.clone()).unwrap();

        let removed = set.remove("m").unwrap();
        assert_eq!(removed, member);
        assert!(set.is_empty());
    }
}
