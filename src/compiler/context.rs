//! Shared state of a compiler pipeline run.
//!
//! The [`CompilerContext`] is handed to every pass by shared reference. It
//! holds the configuration, the event log and the per-function results of
//! the analysis passes. Result maps use `DashMap` so passes can store into
//! them through `&self`.

use dashmap::DashMap;

use crate::{
    compiler::{
        alloc::SlotAssignment, config::CompilerConfig, events::EventLog, structure::ControlTree,
    },
    ir::FunctionId,
};

/// Compiler context for one pipeline run.
pub struct CompilerContext {
    /// Pipeline configuration.
    pub config: CompilerConfig,

    /// Accumulated events from all passes and the scheduler.
    pub events: EventLog,

    /// Slot assignment per function, stored by the allocation pass.
    slot_assignments: DashMap<FunctionId, SlotAssignment>,

    /// Structured control flow per function, stored by the structuring pass.
    control_trees: DashMap<FunctionId, ControlTree>,
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl CompilerContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            events: EventLog::new(),
            slot_assignments: DashMap::new(),
            control_trees: DashMap::new(),
        }
    }

    /// Stores the slot assignment of `function`, replacing any earlier one.
    pub fn set_slot_assignment(&self, function: FunctionId, assignment: SlotAssignment) {
        self.slot_assignments.insert(function, assignment);
    }

    /// Returns a copy of the slot assignment of `function`.
    #[must_use]
    pub fn slot_assignment(&self, function: FunctionId) -> Option<SlotAssignment> {
        self.slot_assignments.get(&function).map(|r| r.clone())
    }

    /// Stores the control tree of `function`, replacing any earlier one.
    pub fn set_control_tree(&self, function: FunctionId, tree: ControlTree) {
        self.control_trees.insert(function, tree);
    }

    /// Returns a copy of the control tree of `function`.
    #[must_use]
    pub fn control_tree(&self, function: FunctionId) -> Option<ControlTree> {
        self.control_trees.get(&function).map(|r| r.clone())
    }

    /// Drops the stored results of `function`.
    ///
    /// Called when a pass changes the function after its results were taken.
    pub fn invalidate(&self, function: FunctionId) {
        self.slot_assignments.remove(&function);
        self.control_trees.remove(&function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::InterferenceGraph, compiler::SlotAllocator, ir::ValueId};

    #[test]
    fn test_results_are_keyed_by_function() {
        let ctx = CompilerContext::default();
        let f0 = FunctionId::new(0);
        let f1 = FunctionId::new(1);

        let mut graph = InterferenceGraph::new();
        graph.add_edge(ValueId::new(0), ValueId::new(1));
        ctx.set_slot_assignment(f0, SlotAllocator::new().allocate(&graph));

        assert_eq!(ctx.slot_assignment(f0).map(|a| a.slot_count()), Some(2));
        assert!(ctx.slot_assignment(f1).is_none());

        ctx.invalidate(f0);
        assert!(ctx.slot_assignment(f0).is_none());
    }
}
