use std::fmt;
use std::str::FromStr;

use snafu::Snafu;

/// Marker that starts every absolute path and names the root node.
pub const ROOT_MARKER: &str = "/";

const SEPARATOR: char = '/';
const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";

/// A slash separated path into a [`Filesystem`](crate::filesystem::Filesystem).
///
/// Absolute paths start at the root marker, relative paths are anchored at
/// whatever the caller decides (usually a shell's working directory).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath {
    absolute: bool,
    parts: Vec<String>,
}

impl NodePath {
    pub fn root() -> Self {
        Self {
            absolute: true,
            parts: Vec::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::EmptyPath);
        }

        let parts = input
            .split(SEPARATOR)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            absolute: input.starts_with(SEPARATOR),
            parts,
        })
    }

    /// Builds a path from already split components.
    pub fn from_parts<I, S>(absolute: bool, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            absolute,
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_root(&self) -> bool {
        self.absolute && self.parts.is_empty()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The final component, `None` for the root and for `.`
    pub fn name(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// The path without its final component. The parent of the root is the
    /// root itself.
    pub fn parent(&self) -> Self {
        let mut parts = self.parts.clone();
        parts.pop();
        Self {
            absolute: self.absolute,
            parts,
        }
    }

    pub fn join(&self, part: impl Into<String>) -> Self {
        let mut joined = self.clone();
        joined.parts.push(part.into());
        joined
    }

    /// Appends every component of `other` to this path, ignoring whether
    /// `other` was absolute.
    pub fn concat(&self, other: &NodePath) -> Self {
        let mut joined = self.clone();
        joined.parts.extend(other.parts.iter().cloned());
        joined
    }

    /// Collapses `.` and `..` components from left to right. A `..` that
    /// would climb above the first component is dropped.
    pub fn normalize(&self) -> Self {
        let mut stack: Vec<String> = Vec::with_capacity(self.parts.len());

        for part in &self.parts {
            match part.as_str() {
                CURRENT_DIR => {}
                PARENT_DIR => {
                    stack.pop();
                }
                _ => stack.push(part.clone()),
            }
        }

        Self {
            absolute: self.absolute,
            parts: stack,
        }
    }

    pub fn is_normalized(&self) -> bool {
        !self
            .parts
            .iter()
            .any(|part| part == CURRENT_DIR || part == PARENT_DIR)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.parts.join(ROOT_MARKER);
        match (self.absolute, joined.is_empty()) {
            (true, _) => write!(f, "{ROOT_MARKER}{joined}"),
            (false, true) => f.write_str(CURRENT_DIR),
            (false, false) => f.write_str(&joined),
        }
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum PathError {
    #[snafu(display("Path is empty"))]
    EmptyPath,
    #[snafu(display("Path {} is not valid UTF-8", path))]
    NonUtf8Path { path: String },
}
