//! Frozen adjacency snapshot of a function's block graph.
//!
//! [`Function`] derives predecessors by scanning every terminator, which is
//! fine for occasional queries but quadratic inside fixpoint algorithms.
//! [`BlockGraph`] captures successor and predecessor lists once so that the
//! dominance computation and the passes built on it get O(1) adjacency.
//!
//! A snapshot is only meaningful while the function's block graph is
//! unchanged; it lives inside the cached
//! [`Dominance`](crate::analysis::Dominance) and is dropped with it.

use crate::{
    ir::Function,
    utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors},
};

/// Successor and predecessor lists of every live block.
///
/// Edges into removed blocks are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGraph {
    entry: NodeId,
    live: Vec<bool>,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl BlockGraph {
    /// Captures the block graph of `func`.
    #[must_use]
    pub fn from_function(func: &Function) -> Self {
        let count = func.node_count();
        let mut live = vec![false; count];
        let mut successors = vec![Vec::new(); count];
        let mut predecessors: Vec<Vec<NodeId>> = vec![Vec::new(); count];

        for block in func.block_ids() {
            live[block.index()] = true;
        }
        for block in func.block_ids() {
            for succ in func.successors(block) {
                if !live.get(succ.index()).copied().unwrap_or(false) {
                    continue;
                }
                successors[block.index()].push(succ);
                let preds = &mut predecessors[succ.index()];
                if !preds.contains(&block) {
                    preds.push(block);
                }
            }
        }

        Self {
            entry: func.entry(),
            live,
            successors,
            predecessors,
        }
    }

    /// Returns the successors of `block` in edge order, duplicates included.
    #[must_use]
    pub fn successor_list(&self, block: NodeId) -> &[NodeId] {
        self.successors.get(block.index()).map_or(&[], Vec::as_slice)
    }

    /// Returns the distinct predecessors of `block` in arena order.
    #[must_use]
    pub fn predecessor_list(&self, block: NodeId) -> &[NodeId] {
        self.predecessors.get(block.index()).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of distinct predecessors of `block`.
    #[must_use]
    pub fn predecessor_count(&self, block: NodeId) -> usize {
        self.predecessor_list(block).len()
    }
}

impl GraphBase for BlockGraph {
    fn node_count(&self) -> usize {
        self.live.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, &live)| live)
            .map(|(i, _)| NodeId::new(i))
    }
}

impl Successors for BlockGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.successor_list(node).iter().copied()
    }
}

impl Predecessors for BlockGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.predecessor_list(node).iter().copied()
    }
}

impl RootedGraph for BlockGraph {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::build_diamond;

    #[test]
    fn test_snapshot_matches_function() {
        let fixture = build_diamond();
        let graph = BlockGraph::from_function(&fixture.func);

        assert_eq!(graph.entry(), fixture.func.entry());
        assert_eq!(
            graph.successor_list(fixture.func.entry()),
            &[fixture.left, fixture.right]
        );
        assert_eq!(
            graph.predecessor_list(fixture.join),
            &[fixture.left, fixture.right]
        );
        assert_eq!(graph.predecessor_count(fixture.func.entry()), 0);
        assert_eq!(graph.node_ids().count(), 4);
    }

    #[test]
    fn test_duplicate_edges_have_one_predecessor_entry() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let target = func.add_block();
        let cond = func.add_argument();
        func.cond_branch(entry, cond, target, target).unwrap();
        func.ret(target, &[]).unwrap();

        let graph = BlockGraph::from_function(&func);
        assert_eq!(graph.successor_list(entry), &[target, target]);
        assert_eq!(graph.predecessor_list(target), &[entry]);
    }
}
