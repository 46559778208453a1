//! Per-function dominance information.
//!
//! [`Dominance`] bundles the three results every dominance consumer needs:
//! the block-graph snapshot it was computed on, the dominator tree, and the
//! dominance frontier of each block. It is produced by
//! [`Function::dominance`](crate::ir::Function::dominance), which caches it
//! until the next block or edge edit.
//!
//! # Iterated dominance frontier
//!
//! [`Dominance::iterated_frontier`] is the closure DF⁺(S) used to place phis:
//! seed a worklist with S and, for each dequeued block, add every frontier
//! block not yet scheduled, enqueueing it in turn.

use std::collections::{BTreeSet, VecDeque};

use crate::{
    analysis::BlockGraph,
    ir::Function,
    utils::{
        graph::{
            algorithms::{compute_dominance_frontiers, compute_dominators, DominatorTree},
            NodeId,
        },
        BitSet,
    },
    Result,
};

static EMPTY_FRONTIER: BTreeSet<NodeId> = BTreeSet::new();

/// Dominator tree and dominance frontiers of one function.
#[derive(Debug, Clone)]
pub struct Dominance {
    graph: BlockGraph,
    tree: DominatorTree,
    frontiers: Vec<BTreeSet<NodeId>>,
}

impl Dominance {
    /// Computes dominance for the current block graph of `func`.
    ///
    /// Prefer [`Function::dominance`], which caches the result.
    ///
    /// # Errors
    ///
    /// Returns an invariant error if the dominator fixpoint does not settle
    /// within `max_iterations` traversals.
    pub fn compute(func: &Function, max_iterations: usize) -> Result<Self> {
        let graph = BlockGraph::from_function(func);
        let tree = compute_dominators(&graph, func.entry(), max_iterations)?;
        let frontiers = compute_dominance_frontiers(&graph, &tree);
        log::trace!(
            "{}: dominance over {} reachable block(s) in {} iteration(s)",
            func.name(),
            tree.preorder().len(),
            tree.iterations()
        );
        Ok(Self {
            graph,
            tree,
            frontiers,
        })
    }

    /// Returns the block-graph snapshot dominance was computed on.
    #[must_use]
    pub fn graph(&self) -> &BlockGraph {
        &self.graph
    }

    /// Returns the dominator tree.
    #[must_use]
    pub fn tree(&self) -> &DominatorTree {
        &self.tree
    }

    /// Returns the entry block.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.tree.entry()
    }

    /// Returns the immediate dominator of `block`; `None` for the entry and
    /// unreachable blocks.
    #[must_use]
    pub fn immediate_dominator(&self, block: NodeId) -> Option<NodeId> {
        self.tree.immediate_dominator(block)
    }

    /// Returns `true` if `a` dominates `b`. Reachable blocks dominate themselves.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.tree.dominates(a, b)
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.tree.strictly_dominates(a, b)
    }

    /// Returns `true` if `block` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, block: NodeId) -> bool {
        self.tree.is_reachable(block)
    }

    /// Returns the dominator-tree children of `block`.
    #[must_use]
    pub fn children(&self, block: NodeId) -> &[NodeId] {
        self.tree.children(block)
    }

    /// Returns the dominance frontier of `block`.
    #[must_use]
    pub fn frontier(&self, block: NodeId) -> &BTreeSet<NodeId> {
        self.frontiers.get(block.index()).unwrap_or(&EMPTY_FRONTIER)
    }

    /// Returns the reachable blocks in depth-first preorder of the block graph.
    #[must_use]
    pub fn reachable_blocks(&self) -> &[NodeId] {
        self.tree.preorder()
    }

    /// Returns the reachable blocks in dominator-tree preorder.
    #[must_use]
    pub fn dominator_preorder(&self) -> Vec<NodeId> {
        self.tree.tree_preorder()
    }

    /// Computes the iterated dominance frontier DF⁺ of `blocks`.
    ///
    /// `admit` filters which frontier blocks may be scheduled; rejected blocks
    /// are neither returned nor expanded further.
    pub fn iterated_frontier<I, F>(&self, blocks: I, mut admit: F) -> BTreeSet<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
        F: FnMut(NodeId) -> bool,
    {
        let mut scheduled = BTreeSet::new();
        let mut queued = BitSet::new(self.frontiers.len());
        let mut worklist: VecDeque<NodeId> = VecDeque::new();
        for block in blocks {
            if queued.insert(block.index()) {
                worklist.push_back(block);
            }
        }

        while let Some(block) = worklist.pop_front() {
            for &frontier in self.frontier(block) {
                if scheduled.contains(&frontier) || !admit(frontier) {
                    continue;
                }
                scheduled.insert(frontier);
                if queued.insert(frontier.index()) {
                    worklist.push_back(frontier);
                }
            }
        }
        scheduled
    }
}
