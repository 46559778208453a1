//! Interference between slot-resident values.
//!
//! Two values interfere when both are live at the same scan point. Each
//! reachable block is scanned top-down:
//!
//! 1. start from the block's live-in set (all pairwise interfering)
//! 2. add the phi results, then the arguments in the entry block
//! 3. for each instruction, drop operands whose last use this is and that
//!    are not live-out, then add the result against everything still live
//!
//! A result nothing consumes is added and dropped again at once, so it
//! still conflicts with what is live across its definition.
//!
//! The graph also carries *equality classes*: each phi grouped with its
//! sources. The allocator uses them as a coloring hint.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::{
    analysis::{Dominance, Liveness},
    ir::{Function, User, ValueId},
    Result,
};

/// Undirected interference graph over values.
#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    nodes: BTreeSet<ValueId>,
    adjacency: FxHashMap<ValueId, BTreeSet<ValueId>>,
    /// Union-find parent links for the equality classes.
    parents: FxHashMap<ValueId, ValueId>,
}

impl InterferenceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the interference graph of `func`.
    ///
    /// # Errors
    ///
    /// Returns an error if dominance cannot be computed or the function holds
    /// stale handles.
    pub fn build(func: &mut Function) -> Result<Self> {
        let dom = func.dominance()?;
        let liveness = Liveness::with_dominance(func, &dom)?;
        Self::from_liveness(func, &dom, &liveness)
    }

    /// Builds the interference graph from computed liveness.
    ///
    /// # Errors
    ///
    /// Returns an error if the function holds stale handles.
    pub fn from_liveness(func: &Function, dom: &Dominance, liveness: &Liveness) -> Result<Self> {
        let mut graph = Self::new();
        for &value in liveness.candidates() {
            graph.add_node(value);
        }

        for &block in dom.reachable_blocks() {
            let data = func.block(block)?;
            let mut live: BTreeSet<ValueId> = BTreeSet::new();
            for value in liveness.live_in(block) {
                graph.define(&live, value);
                live.insert(value);
            }

            for &phi in data.phis() {
                let result = func.phi(phi)?.result();
                if liveness.is_candidate(result) {
                    graph.define(&live, result);
                    live.insert(result);
                }
            }
            if block == func.entry() {
                for &argument in func.arguments() {
                    if liveness.is_candidate(argument) {
                        graph.define(&live, argument);
                        live.insert(argument);
                    }
                }
            }

            for &inst in data.instructions() {
                let instruction = func.instruction(inst)?;
                for &operand in instruction.operands() {
                    if liveness.last_use(operand, block) == Some(User::Inst(inst))
                        && !liveness.is_live_out(operand, block)
                    {
                        live.remove(&operand);
                    }
                }
                if let Some(result) = instruction.result() {
                    if liveness.is_candidate(result) {
                        graph.define(&live, result);
                        if !func.value(result)?.is_unused() {
                            live.insert(result);
                        }
                    }
                }
            }
        }

        for phi in func.phi_ids() {
            let phi = func.phi(phi)?;
            if !graph.contains(phi.result()) {
                continue;
            }
            for &source in phi.sources().values() {
                if graph.contains(source) {
                    graph.add_equality(phi.result(), source);
                }
            }
        }

        log::trace!(
            "{}: interference graph with {} node(s), {} edge(s)",
            func.name(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Adds `value` against every value in `live`.
    fn define(&mut self, live: &BTreeSet<ValueId>, value: ValueId) {
        self.add_node(value);
        for &other in live {
            self.add_edge(value, other);
        }
    }

    /// Adds a node without edges.
    pub fn add_node(&mut self, value: ValueId) {
        self.nodes.insert(value);
        self.adjacency.entry(value).or_default();
    }

    /// Adds an interference edge. Self-edges are ignored.
    pub fn add_edge(&mut self, a: ValueId, b: ValueId) {
        if a == b {
            return;
        }
        self.add_node(a);
        self.add_node(b);
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Records that `a` and `b` should preferably share a slot.
    pub fn add_equality(&mut self, a: ValueId, b: ValueId) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            // Smaller id wins so classes do not depend on insertion order.
            let (root, child) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parents.insert(child, root);
        }
    }

    fn find(&self, mut value: ValueId) -> ValueId {
        while let Some(&parent) = self.parents.get(&value) {
            value = parent;
        }
        value
    }

    /// Returns the nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.nodes.iter().copied()
    }

    /// Returns `true` if `value` is a node.
    #[must_use]
    pub fn contains(&self, value: ValueId) -> bool {
        self.nodes.contains(&value)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Returns the values interfering with `value`, in id order.
    pub fn neighbors(&self, value: ValueId) -> impl Iterator<Item = ValueId> + '_ {
        self.adjacency.get(&value).into_iter().flatten().copied()
    }

    /// Returns the number of values interfering with `value`.
    #[must_use]
    pub fn degree(&self, value: ValueId) -> usize {
        self.adjacency.get(&value).map_or(0, BTreeSet::len)
    }

    /// Returns `true` if `a` and `b` interfere.
    #[must_use]
    pub fn interferes(&self, a: ValueId, b: ValueId) -> bool {
        self.adjacency.get(&a).is_some_and(|n| n.contains(&b))
    }

    /// Returns the equality classes with more than one member.
    ///
    /// Members are in id order; classes are ordered by their smallest member.
    #[must_use]
    pub fn equality_classes(&self) -> Vec<Vec<ValueId>> {
        let mut classes: FxHashMap<ValueId, Vec<ValueId>> = FxHashMap::default();
        for &value in &self.nodes {
            classes.entry(self.find(value)).or_default().push(value);
        }
        let mut classes: Vec<Vec<ValueId>> =
            classes.into_values().filter(|c| c.len() > 1).collect();
        classes.sort();
        classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::SsaPromoter,
        ir::BinaryOp,
        test::{build_counter, build_ternary},
    };

    #[test]
    fn test_simultaneously_live_values_interfere() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let a = func.add_argument();
        let b = func.add_argument();
        let c = func.binary(entry, BinaryOp::Add, a, b).unwrap();
        let d = func.binary(entry, BinaryOp::Mul, c, c).unwrap();
        func.ret(entry, &[d]).unwrap();

        let graph = InterferenceGraph::build(&mut func).unwrap();
        assert!(graph.interferes(a, b));
        // `a` and `b` die at the add, so `c` reuses their slots.
        assert!(!graph.interferes(a, c));
        assert!(!graph.interferes(b, c));
        assert!(!graph.interferes(c, d));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_value_live_across_definition_interferes() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let a = func.add_argument();
        let b = func.unary(entry, crate::ir::UnaryOp::Neg, a).unwrap();
        let c = func.binary(entry, BinaryOp::Add, a, b).unwrap();
        func.ret(entry, &[c]).unwrap();

        let graph = InterferenceGraph::build(&mut func).unwrap();
        assert!(graph.interferes(a, b));
        assert!(!graph.interferes(a, c));
        assert_eq!(graph.degree(a), 1);
    }

    #[test]
    fn test_dead_definition_still_conflicts() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let a = func.add_argument();
        let dead = func.unary(entry, crate::ir::UnaryOp::Not, a).unwrap();
        func.ret(entry, &[a]).unwrap();

        let graph = InterferenceGraph::build(&mut func).unwrap();
        assert!(graph.contains(dead));
        assert!(graph.interferes(a, dead));
    }

    #[test]
    fn test_phi_equality_classes() {
        let fixture = build_counter();
        let mut func = fixture.func;
        SsaPromoter::new().promote_all(&mut func).unwrap();
        let graph = InterferenceGraph::build(&mut func).unwrap();

        let phi = func.phi_ids().next().unwrap();
        let counter = func.phi(phi).unwrap().result();
        // The constant source is not slot-resident.
        let mut expected = vec![counter, fixture.incremented];
        expected.sort();
        assert_eq!(graph.equality_classes(), vec![expected]);
        assert!(!graph.interferes(counter, fixture.incremented));
    }

    #[test]
    fn test_ternary_phi_has_no_resident_sources() {
        let fixture = build_ternary();
        let mut func = fixture.func;
        SsaPromoter::new().promote_all(&mut func).unwrap();
        let graph = InterferenceGraph::build(&mut func).unwrap();

        assert!(graph.equality_classes().is_empty());
        assert_eq!(graph.node_count(), 2);
    }
}
