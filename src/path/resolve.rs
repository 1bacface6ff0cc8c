use crate::path::NodePath;

/// Turns `input` into an absolute, `.`/`..` collapsed path.
///
/// Relative inputs are anchored at `cwd`, which must itself be absolute.
/// `..` never climbs above the root.
pub fn resolve(cwd: &NodePath, input: &NodePath) -> NodePath {
    let anchored = if input.is_absolute() {
        input.clone()
    } else {
        cwd.concat(input)
    };

    if anchored.is_normalized() {
        anchored
    } else {
        anchored.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("/", ".", "/")]
    #[case("/a/b", ".", "/a/b")]
    #[case("/a/b", "..", "/a")]
    #[case("/a/b", "../../..", "/")]
    #[case("/a", "b/c", "/a/b/c")]
    #[case("/a", "./b/../c", "/a/c")]
    #[case("/a/b", "/x/../y", "/y")]
    #[case("/deep/cwd", "/", "/")]
    fn resolve_anchors_and_collapses(
        #[case] cwd: &str,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let cwd = NodePath::parse(cwd).unwrap();
        let input = NodePath::parse(input).unwrap();
        assert_eq!(resolve(&cwd, &input).to_string(), expected);
    }

    #[test]
    fn resolving_a_normalized_absolute_path_is_identity() {
        let cwd = NodePath::parse("/somewhere").unwrap();
        let input = NodePath::parse("/a/b/c").unwrap();
        assert_eq!(resolve(&cwd, &input), input);
    }
}
