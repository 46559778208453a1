//! Slot allocation by greedy graph coloring.
//!
//! Every node of an [`InterferenceGraph`] receives a slot index so that
//! interfering values never share one. Nodes are colored in Welsh-Powell
//! order, degree descending with ties broken by value id, each taking the
//! lowest slot none of its colored neighbors holds.
//!
//! With phi coalescing enabled, coloring a node immediately offers the same
//! slot to the uncolored members of its equality class. A member accepts if
//! none of its colored neighbors holds that slot; otherwise it is colored
//! normally when its turn comes. Phis whose sources share their slot need no
//! moves at phi elimination.
//!
//! The result is deterministic for a given graph.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::{
    analysis::InterferenceGraph,
    ir::{Function, ValueId},
    Result,
};

/// Slot index per value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAssignment {
    slots: BTreeMap<ValueId, usize>,
    slot_count: usize,
}

impl SlotAssignment {
    /// Returns the slot of `value`, if it was allocated one.
    #[must_use]
    pub fn slot(&self, value: ValueId) -> Option<usize> {
        self.slots.get(&value).copied()
    }

    /// Returns the number of distinct slots used.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Returns the number of allocated values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no value was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `(value, slot)` pairs in value order.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, usize)> + '_ {
        self.slots.iter().map(|(&v, &s)| (v, s))
    }

    /// Returns the values held in `slot`, in value order.
    #[must_use]
    pub fn values_in(&self, slot: usize) -> Vec<ValueId> {
        self.iter()
            .filter(|&(_, s)| s == slot)
            .map(|(v, _)| v)
            .collect()
    }

    /// Returns every interfering pair that shares a slot.
    ///
    /// Empty for any assignment produced by [`SlotAllocator`].
    #[must_use]
    pub fn conflicts(&self, graph: &InterferenceGraph) -> Vec<(ValueId, ValueId)> {
        let mut conflicts = Vec::new();
        for (value, slot) in self.iter() {
            for other in graph.neighbors(value) {
                if value < other && self.slot(other) == Some(slot) {
                    conflicts.push((value, other));
                }
            }
        }
        conflicts
    }
}

/// Welsh-Powell slot allocator.
#[derive(Debug, Clone, Copy)]
pub struct SlotAllocator {
    coalesce_phis: bool,
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotAllocator {
    /// Creates an allocator with phi coalescing enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coalesce_phis: true,
        }
    }

    /// Sets whether equality classes bias the coloring.
    #[must_use]
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_phis = enabled;
        self
    }

    /// Colors `graph`.
    #[must_use]
    pub fn allocate(&self, graph: &InterferenceGraph) -> SlotAssignment {
        let mut order: Vec<ValueId> = graph.nodes().collect();
        order.sort_by(|a, b| graph.degree(*b).cmp(&graph.degree(*a)).then(a.cmp(b)));

        let classes = if self.coalesce_phis {
            graph.equality_classes()
        } else {
            Vec::new()
        };
        let mut class_of: FxHashMap<ValueId, usize> = FxHashMap::default();
        for (index, class) in classes.iter().enumerate() {
            for &member in class {
                class_of.insert(member, index);
            }
        }

        let mut slots: BTreeMap<ValueId, usize> = BTreeMap::new();
        for value in order {
            if slots.contains_key(&value) {
                continue;
            }
            let slot = lowest_free(graph, &slots, value);
            slots.insert(value, slot);

            let Some(&class) = class_of.get(&value) else {
                continue;
            };
            for &member in &classes[class] {
                if !slots.contains_key(&member) && is_free(graph, &slots, member, slot) {
                    slots.insert(member, slot);
                }
            }
        }

        let slot_count = slots.values().max().map_or(0, |&max| max + 1);
        SlotAssignment { slots, slot_count }
    }

    /// Builds the interference graph of `func` and colors it.
    ///
    /// # Errors
    ///
    /// Returns an error if the interference graph cannot be built.
    pub fn allocate_function(&self, func: &mut Function) -> Result<SlotAssignment> {
        let graph = InterferenceGraph::build(func)?;
        let assignment = self.allocate(&graph);
        log::debug!(
            "{}: {} value(s) in {} slot(s)",
            func.name(),
            assignment.len(),
            assignment.slot_count()
        );
        Ok(assignment)
    }
}

fn lowest_free(graph: &InterferenceGraph, slots: &BTreeMap<ValueId, usize>, value: ValueId) -> usize {
    let taken: BTreeSet<usize> = graph
        .neighbors(value)
        .filter_map(|n| slots.get(&n).copied())
        .collect();
    (0..).find(|slot| !taken.contains(slot)).unwrap_or_default()
}

fn is_free(
    graph: &InterferenceGraph,
    slots: &BTreeMap<ValueId, usize>,
    value: ValueId,
    slot: usize,
) -> bool {
    graph
        .neighbors(value)
        .all(|n| slots.get(&n).copied() != Some(slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(index: usize) -> ValueId {
        ValueId::new(index)
    }

    fn graph(nodes: usize, edges: &[(usize, usize)]) -> InterferenceGraph {
        let mut graph = InterferenceGraph::new();
        for i in 0..nodes {
            graph.add_node(v(i));
        }
        for &(a, b) in edges {
            graph.add_edge(v(a), v(b));
        }
        graph
    }

    #[test]
    fn test_triangle_needs_three_slots() {
        let graph = graph(3, &[(0, 1), (1, 2), (0, 2)]);
        let assignment = SlotAllocator::new().allocate(&graph);
        assert_eq!(assignment.slot_count(), 3);
        assert!(assignment.conflicts(&graph).is_empty());
    }

    #[test]
    fn test_independent_values_share_a_slot() {
        let graph = graph(4, &[]);
        let assignment = SlotAllocator::new().allocate(&graph);
        assert_eq!(assignment.slot_count(), 1);
        assert_eq!(assignment.values_in(0), vec![v(0), v(1), v(2), v(3)]);
    }

    #[test]
    fn test_complete_graph_uses_one_slot_per_node() {
        let edges: Vec<(usize, usize)> = (0..5)
            .flat_map(|a| (a + 1..5).map(move |b| (a, b)))
            .collect();
        let graph = graph(5, &edges);
        let assignment = SlotAllocator::new().allocate(&graph);
        assert_eq!(assignment.slot_count(), 5);
        assert!(assignment.conflicts(&graph).is_empty());
    }

    #[test]
    fn test_highest_degree_colored_first() {
        // Star around v3 plus a path v0 - v1.
        let graph = graph(5, &[(3, 0), (3, 1), (3, 2), (3, 4), (0, 1)]);
        let assignment = SlotAllocator::new().allocate(&graph);
        assert_eq!(assignment.slot(v(3)), Some(0));
        assert_eq!(assignment.slot(v(0)), Some(1));
        assert_eq!(assignment.slot(v(1)), Some(2));
        assert_eq!(assignment.slot(v(2)), Some(1));
        assert_eq!(assignment.slot_count(), 3);
    }

    #[test]
    fn test_empty_graph() {
        let assignment = SlotAllocator::new().allocate(&InterferenceGraph::new());
        assert!(assignment.is_empty());
        assert_eq!(assignment.slot_count(), 0);
    }

    #[test]
    fn test_coalescing_biases_equality_classes() {
        // v0 = phi(v4); v0 - v1, v0 - v2, v3 - v4.
        let mut graph = graph(5, &[(0, 1), (0, 2), (3, 4)]);
        graph.add_equality(v(0), v(4));

        let plain = SlotAllocator::new().with_coalescing(false).allocate(&graph);
        assert_ne!(plain.slot(v(0)), plain.slot(v(4)));

        let biased = SlotAllocator::new().allocate(&graph);
        assert_eq!(biased.slot(v(0)), biased.slot(v(4)));
        assert!(biased.conflicts(&graph).is_empty());
        assert_eq!(biased.slot_count(), plain.slot_count());
    }

    #[test]
    fn test_coalescing_never_breaks_interference() {
        let mut graph = graph(2, &[(0, 1)]);
        graph.add_equality(v(0), v(1));
        let assignment = SlotAllocator::new().allocate(&graph);
        assert_ne!(assignment.slot(v(0)), assignment.slot(v(1)));
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let graph = graph(6, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 3)]);
        let first = SlotAllocator::new().allocate(&graph);
        for _ in 0..5 {
            assert_eq!(SlotAllocator::new().allocate(&graph), first);
        }
    }
}
