//! Generic rooted-graph infrastructure for control-flow analysis.
//!
//! # Architecture
//!
//! - **Core Types**: [`NodeId`] is the strongly-typed node (block) identifier
//! - **Traits**: [`GraphBase`], [`Successors`], [`Predecessors`] and
//!   [`RootedGraph`] abstract over concrete graph storage
//! - **Algorithms**: traversal orders and dominance computation in [`algorithms`]
//!
//! The IR's [`Function`](crate::ir::Function) implements the traits directly,
//! with successors read off each block's terminator and predecessors derived
//! from them, so the algorithms never need a separate copy of the block graph.

mod node;
mod traits;

pub mod algorithms;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
