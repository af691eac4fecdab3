//! Reaction Runtime - Graph store and evaluation engine
//!
//! This crate contains the node spec registry, the built-in specs, the graph
//! store with its link invariants, and the evaluator.

pub use reaction_types;

mod error;
mod evaluator;
mod graph;
mod registry;
mod specs;
mod store;

pub use error::*;
pub use evaluator::*;
pub use graph::*;
pub use registry::*;
pub use specs::*;
pub use store::*;
