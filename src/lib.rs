pub mod avl_tree;
pub mod command;
mod pool;
pub mod shape;

pub use avl_tree::{BalancedTree, InvariantViolation, NodeRef};
pub use shape::Shape;
