//! Depth-first traversal orders.
//!
//! All traversals are iterative with an explicit stack, so arbitrarily deep
//! synthetic control flow cannot overflow the call stack. Successors are
//! visited in the order the graph yields them, which makes every order here
//! deterministic for a given graph.
//!
//! - [`preorder`] - a node is listed before the nodes first discovered from it
//! - [`postorder`] - a node is listed after all nodes reachable through it
//! - [`reverse_postorder`] - reverse of [`postorder`]

use crate::utils::{
    graph::{NodeId, Successors},
    BitSet,
};

/// Returns the nodes reachable from `start` in depth-first preorder.
///
/// Every node except `start` appears after at least one of its predecessors,
/// which is the property the iterative dominator computation relies on.
///
/// # Examples
///
/// ```rust,ignore
/// use irscope::utils::graph::{NodeId, algorithms::preorder};
///
/// // a -> b, a -> c, b -> d
/// let order = preorder(&graph, a);
/// assert_eq!(order, vec![a, b, d, c]);
/// ```
pub fn preorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut visited = BitSet::new(graph.node_count());
    let mut result = Vec::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if !visited.insert(node.index()) {
            continue;
        }
        result.push(node);

        let successors: Vec<NodeId> = graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !visited.contains(succ.index()) {
                stack.push(succ);
            }
        }
    }

    result
}

/// Returns the nodes reachable from `start` in depth-first postorder.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut visited = BitSet::new(graph.node_count());
    let mut result = Vec::new();

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if !visited.insert(node.index()) {
                    continue;
                }
                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited.contains(succ.index()) {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Returns the nodes reachable from `start` in reverse postorder.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::EdgeListGraph;

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    #[test]
    fn test_preorder_diamond() {
        let graph = EdgeListGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(preorder(&graph, n(0)), vec![n(0), n(1), n(3), n(2)]);
    }

    #[test]
    fn test_postorder_diamond() {
        let graph = EdgeListGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(postorder(&graph, n(0)), vec![n(3), n(1), n(2), n(0)]);
        assert_eq!(
            reverse_postorder(&graph, n(0)),
            vec![n(0), n(2), n(1), n(3)]
        );
    }

    #[test]
    fn test_traversal_skips_unreachable() {
        let graph = EdgeListGraph::new(4, &[(0, 1), (2, 3)]);
        assert_eq!(preorder(&graph, n(0)), vec![n(0), n(1)]);
        assert_eq!(postorder(&graph, n(0)), vec![n(1), n(0)]);
    }

    #[test]
    fn test_traversal_handles_cycles() {
        let graph = EdgeListGraph::new(3, &[(0, 1), (1, 2), (2, 1), (1, 1)]);
        assert_eq!(preorder(&graph, n(0)), vec![n(0), n(1), n(2)]);
        assert_eq!(postorder(&graph, n(0)), vec![n(2), n(1), n(0)]);
    }

    #[test]
    fn test_preorder_deep_chain_is_iterative() {
        let edges: Vec<(usize, usize)> = (0..50_000).map(|i| (i, i + 1)).collect();
        let graph = EdgeListGraph::new(50_001, &edges);
        let order = preorder(&graph, n(0));
        assert_eq!(order.len(), 50_001);
        assert_eq!(order.last(), Some(&n(50_000)));
    }
}
