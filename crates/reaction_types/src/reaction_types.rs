//! Reaction Types - Core data structures for the reaction graph editor
//!
//! This crate contains the pure data model shared by the runtime and the
//! editor session: the closed type catalog, native values, and the node
//! instance model (ports, state, position).

mod node;
mod types;
mod value;

pub use node::*;
pub use types::*;
pub use value::*;
