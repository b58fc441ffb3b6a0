//! Node graph: structure, properties, traversal and evaluation.

pub mod document;
mod evaluate;
pub mod node;
mod node_graph;
pub mod property;
pub mod registry;
mod traverse;

pub use node_graph::{GraphOpts, NodeGraph};
pub use traverse::Traversal;
