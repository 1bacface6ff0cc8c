use std::path::{Path, PathBuf};

use crate::path::{NodePath, PathError};

/// Anything a shell accepts where a path is expected.
pub trait AsNodePath {
    fn to_node_path(&self) -> Result<NodePath, PathError>;
}

impl AsNodePath for NodePath {
    fn to_node_path(&self) -> Result<NodePath, PathError> {
        Ok(self.clone())
    }
}

impl AsNodePath for str {
    fn to_node_path(&self) -> Result<NodePath, PathError> {
        NodePath::parse(self)
    }
}

impl AsNodePath for String {
    fn to_node_path(&self) -> Result<NodePath, PathError> {
        NodePath::parse(self)
    }
}

impl AsNodePath for Path {
    fn to_node_path(&self) -> Result<NodePath, PathError> {
        match self.to_str() {
            Some(s) => NodePath::parse(s),
            None => Err(PathError::NonUtf8Path {
                path: self.to_string_lossy().into_owned(),
            }),
        }
    }
}

impl AsNodePath for PathBuf {
    fn to_node_path(&self) -> Result<NodePath, PathError> {
        self.as_path().to_node_path()
    }
}

impl<T: AsNodePath + ?Sized> AsNodePath for &T {
    fn to_node_path(&self) -> Result<NodePath, PathError> {
        (**self).to_node_path()
    }
}
