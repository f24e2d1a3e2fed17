mod avl_tree;
mod binary_tree;
mod config;
pub mod diagnostics;

pub use avl_tree::{AvlError, AvlNode, AvlTree, CompareFn, Factor, Insertion};
pub use binary_tree::{BinaryTree, BinaryTreeError, DestroyFn, Node, Side};
pub use config::{ConfigError, TreeConfig};
pub use diagnostics::{DiagnosticSink, NullSink, Subsystem, TracingSink};
