mod node_path_ext;

pub use node_path_ext::AsNodePath;
