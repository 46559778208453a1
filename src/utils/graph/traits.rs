//! Trait definitions for graph abstractions.
//!
//! The dominance and traversal algorithms are written against these traits,
//! so they run unchanged on an IR [`Function`](crate::ir::Function) and on the
//! small edge-list graphs used in tests.
//!
//! - [`GraphBase`] - Node count and node iteration
//! - [`Successors`] - Forward edge traversal
//! - [`Predecessors`] - Backward edge traversal
//! - [`RootedGraph`] - Graphs with a designated entry node

use crate::utils::graph::NodeId;

/// Basic graph properties.
pub trait GraphBase {
    /// Returns an upper bound on node indices (the arena size).
    ///
    /// Algorithms size their per-node tables with this value; it may exceed the
    /// number of live nodes when the graph contains tombstones.
    fn node_count(&self) -> usize;

    /// Iterates over the identifiers of all live nodes.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward edge traversal.
pub trait Successors: GraphBase {
    /// Iterates over the successors of `node`, in edge order.
    ///
    /// A successor reached through two parallel edges may be yielded twice.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Iterates over the distinct predecessors of `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a designated entry node.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry node.
    fn entry(&self) -> NodeId;
}
