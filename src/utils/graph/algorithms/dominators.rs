//! Dominator tree and dominance frontier computation.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n`
//! passes through `d`. The **immediate dominator** of `n` is the unique strict
//! dominator of `n` that is dominated by every other strict dominator of `n`.
//! Making each node's immediate dominator its parent yields the dominator tree.
//!
//! # Algorithm
//!
//! Immediate dominators are computed with an iterative fixpoint that does not
//! need postorder numbers:
//!
//! 1. Visit the reachable nodes in a fixed depth-first preorder.
//! 2. For each non-entry node, start the candidate at the first
//!    already-visited predecessor, then refine it with the common dominator of
//!    the candidate and every other already-visited predecessor. The common
//!    dominator is found by walking both idom chains to their first shared node.
//! 3. Repeat the traversal until no candidate changes.
//!
//! Preorder guarantees that every non-entry node has a visited predecessor (the
//! node it was discovered from) on the very first traversal.
//!
//! Dominance frontiers are then computed in one postorder pass over the
//! dominator tree (Cytron et al.):
//!
//! ```text
//! DF(b) = { s in succ(b)      : idom(s) != b }
//!       ∪ { w in DF(c), c in children(b) : idom(w) != b }
//! ```

use std::collections::BTreeSet;

use crate::{
    utils::{
        graph::{algorithms::preorder, NodeId, Predecessors, Successors},
        BitSet,
    },
    Result,
};

/// Result of dominator tree computation.
///
/// Nodes that are not reachable from the entry have no immediate dominator,
/// are dominated by nothing and dominate nothing.
///
/// # Examples
///
/// ```rust,ignore
/// use irscope::utils::graph::algorithms::compute_dominators;
///
/// // entry -> a -> b
/// let tree = compute_dominators(&graph, entry, 64)?;
/// assert!(tree.dominates(entry, b));
/// assert_eq!(tree.immediate_dominator(b), Some(a));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorTree {
    /// The entry (root) node of the dominator tree
    entry: NodeId,
    /// Immediate dominator for each node index; `None` for the entry and unreachable nodes
    idom: Vec<Option<NodeId>>,
    /// Dominator-tree children, in traversal preorder
    children: Vec<Vec<NodeId>>,
    /// Reachable nodes in the traversal preorder used by the fixpoint
    preorder: Vec<NodeId>,
    /// Reachable nodes
    reachable: BitSet,
    /// Number of traversals needed to reach the fixpoint
    iterations: usize,
}

impl DominatorTree {
    /// Returns the entry (root) node of the dominator tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of a node.
    ///
    /// Returns `None` for the entry node and for unreachable nodes.
    #[inline]
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `node` is reachable from the entry.
    #[inline]
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.reachable.contains(node.index())
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A reachable node dominates itself.
    ///
    /// # Complexity
    ///
    /// O(depth) where depth is the depth of `b` in the dominator tree.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        self.dominators(b).any(|d| d == a)
    }

    /// Checks if node `a` strictly dominates node `b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns an iterator over all dominators of a node, from the node itself
    /// up to (and including) the entry node.
    ///
    /// The iterator is empty for unreachable nodes.
    pub fn dominators(&self, node: NodeId) -> DominatorIterator<'_> {
        DominatorIterator {
            tree: self,
            current: self.is_reachable(node).then_some(node),
        }
    }

    /// Returns the depth of a node in the dominator tree. The entry has depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.dominators(node).count().saturating_sub(1)
    }

    /// Returns the dominator-tree children of a node.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children
            .get(node.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the reachable nodes in the preorder the fixpoint iterated over.
    #[must_use]
    pub fn preorder(&self) -> &[NodeId] {
        &self.preorder
    }

    /// Returns the number of traversals the fixpoint needed (at least one).
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the reachable nodes in dominator-tree preorder.
    ///
    /// Parents come before children; siblings keep their `children` order.
    #[must_use]
    pub fn tree_preorder(&self) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(self.preorder.len());
        let mut stack = vec![self.entry];
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        result
    }

    /// Returns the reachable nodes in dominator-tree postorder.
    ///
    /// Every node comes after all of its dominator-tree descendants.
    #[must_use]
    pub fn tree_postorder(&self) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(self.preorder.len());
        let mut stack = vec![(self.entry, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                result.push(node);
            } else {
                stack.push((node, true));
                for &child in self.children(node).iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        result
    }
}

/// Iterator over dominators of a node, from the node up to the entry.
pub struct DominatorIterator<'a> {
    tree: &'a DominatorTree,
    current: Option<NodeId>,
}

impl Iterator for DominatorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.tree.immediate_dominator(current);
        Some(current)
    }
}

/// Computes the dominator tree of the nodes reachable from `entry`.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
/// * `entry` - The root node
/// * `max_iterations` - Upper bound on preorder traversals before giving up
///
/// # Errors
///
/// Returns an invariant error if the fixpoint does not settle within
/// `max_iterations` traversals, which can only happen if the graph changes
/// underneath the computation or the bound is unreasonably small.
///
/// # Complexity
///
/// O(k · E · D) where `k` is the number of traversals (two or three for
/// structured code) and `D` is the dominator tree depth.
pub fn compute_dominators<G>(graph: &G, entry: NodeId, max_iterations: usize) -> Result<DominatorTree>
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count().max(entry.index() + 1);
    let order = preorder(graph, entry);
    let reachable: BitSet = order.iter().map(|n| n.index()).collect();

    let mut idom: Vec<Option<NodeId>> = vec![None; node_count];
    let mut visited = BitSet::new(node_count);
    visited.insert(entry.index());

    let mut iterations = 0;
    loop {
        if iterations == max_iterations {
            return Err(invariant_error!(
                "Dominator fixpoint did not settle within {} iterations",
                max_iterations
            ));
        }
        iterations += 1;

        let mut changed = false;
        for &node in order.iter().skip(1) {
            let mut candidate: Option<NodeId> = None;
            for pred in graph.predecessors(node) {
                if !visited.contains(pred.index()) {
                    continue;
                }
                candidate = Some(match candidate {
                    None => pred,
                    Some(current) => common_dominator(&idom, current, pred),
                });
            }

            if candidate.is_none() {
                return Err(invariant_error!(
                    "Node {} reached in preorder without a visited predecessor",
                    node
                ));
            }
            if idom[node.index()] != candidate {
                idom[node.index()] = candidate;
                changed = true;
            }
            visited.insert(node.index());
        }

        if !changed {
            break;
        }
    }

    let mut children: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    for &node in order.iter().skip(1) {
        if let Some(parent) = idom[node.index()] {
            children[parent.index()].push(node);
        }
    }

    Ok(DominatorTree {
        entry,
        idom,
        children,
        preorder: order,
        reachable,
        iterations,
    })
}

/// Walks the idom chains of `a` and `b` to their least common node.
fn common_dominator(idom: &[Option<NodeId>], a: NodeId, b: NodeId) -> NodeId {
    let mut ancestors = BitSet::new(idom.len());
    let mut current = Some(a);
    while let Some(node) = current {
        ancestors.insert(node.index());
        current = idom[node.index()];
    }

    let mut runner = b;
    loop {
        if ancestors.contains(runner.index()) {
            return runner;
        }
        match idom[runner.index()] {
            Some(parent) => runner = parent,
            // Both chains end at the entry, so this is only hit when `b` is the entry.
            None => return runner,
        }
    }
}

/// Computes dominance frontiers for all reachable nodes.
///
/// The dominance frontier of `n` is the set of nodes `m` such that `n`
/// dominates a predecessor of `m` but does not strictly dominate `m`.
///
/// # Returns
///
/// A vector indexed by node index. Unreachable nodes get an empty frontier.
/// Sets are ordered so that consumers iterate them deterministically.
///
/// # Complexity
///
/// - Time: O(V + E + Σ|DF|)
/// - Space: O(V²) worst case for the frontiers
pub fn compute_dominance_frontiers<G>(graph: &G, tree: &DominatorTree) -> Vec<BTreeSet<NodeId>>
where
    G: Successors,
{
    let node_count = graph.node_count().max(tree.idom.len());
    let mut frontiers: Vec<BTreeSet<NodeId>> = vec![BTreeSet::new(); node_count];

    for node in tree.tree_postorder() {
        let mut frontier = BTreeSet::new();

        for succ in graph.successors(node) {
            if tree.immediate_dominator(succ) != Some(node) {
                frontier.insert(succ);
            }
        }

        for &child in tree.children(node) {
            for &w in &frontiers[child.index()] {
                if tree.immediate_dominator(w) != Some(node) {
                    frontier.insert(w);
                }
            }
        }

        frontiers[node.index()] = frontier;
    }

    frontiers
}
