use crate::node::Node;

/// Strings used to draw a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStyle {
    /// Repeated once per nesting level in front of a branch.
    pub indent: String,
    pub branch: String,
    /// Appended to directory names so they stand out from leaves.
    pub directory_suffix: String,
}

impl Default for TreeStyle {
    fn default() -> Self {
        Self {
            indent: "|  ".to_string(),
            branch: "|__".to_string(),
            directory_suffix: "/".to_string(),
        }
    }
}

impl TreeStyle {
    fn label<D, M>(&self, node: &Node<D, M>) -> String {
        let name = node.name();
        if node.is_directory() && !node.is_root() {
            format!("{name}{}", self.directory_suffix)
        } else {
            name
        }
    }
}

pub(crate) fn render_tree<D, M>(directory: &Node<D, M>, style: &TreeStyle) -> String {
    let mut out = style.label(directory);
    render_children(directory, style, 0, &mut out);
    out
}

fn render_children<D, M>(
    directory: &Node<D, M>,
    style: &TreeStyle,
    depth: usize,
    out: &mut String,
) {
    let mut children = directory.children().unwrap_or_default();
    children.sort_by_key(Node::name);

    for child in children {
        out.push('\n');
        out.push_str(&style.indent.repeat(depth));
        out.push_str(&style.branch);
        out.push_str(&style.label(&child));
        if child.is_directory() {
            render_children(&child, style, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestNode = Node<(), ()>;

    fn sample() -> TestNode {
        let root = TestNode::root();
        let usr = TestNode::new_directory("usr", Some(&root)).unwrap();
        let bin = TestNode::new_directory("bin", Some(&usr)).unwrap();
        TestNode::new_leaf("sh", Some(&bin), None).unwrap();
        TestNode::new_leaf("README", Some(&usr), None).unwrap();
        TestNode::new_leaf("boot", Some(&root), None).unwrap();
        root
    }

    #[test]
    fn renders_sorted_and_indented() {
        let expected = "/\n|__boot\n|__usr/\n|  |__README\n|  |__bin/\n|  |  |__sh";
        assert_eq!(render_tree(&sample(), &TreeStyle::default()), expected);
    }

    #[test]
    fn custom_style_is_applied() {
        let style = TreeStyle {
            indent: "  ".to_string(),
            branch: "- ".to_string(),
            directory_suffix: "/".to_string(),
        };
        let root = TestNode::root();
        let a = TestNode::new_directory("a", Some(&root)).unwrap();
        TestNode::new_leaf("f", Some(&a), None).unwrap();

        assert_eq!(render_tree(&root, &style), "/\n- a/\n  - f");
    }

    #[test]
    fn directories_keep_the_suffix_their_name_already_ends_with() {
        let style = TreeStyle {
            indent: "  ".to_string(),
            branch: "- ".to_string(),
            directory_suffix: "s".to_string(),
        };
        let root = TestNode::root();
        TestNode::new_directory("docs", Some(&root)).unwrap();
        TestNode::new_leaf("docs2", Some(&root), None).unwrap();

        assert_eq!(render_tree(&root, &style), "/\n- docss\n- docs2");
    }

    #[test]
    fn empty_directory_renders_only_its_label() {
        let root = TestNode::root();
        let empty = TestNode::new_directory("empty", Some(&root)).unwrap();
        assert_eq!(render_tree(&empty, &TreeStyle::default()), "empty/");
    }
}
