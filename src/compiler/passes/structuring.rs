//! Control-flow structuring pass.
//!
//! Builds the [`ControlTree`] of a function and stores it in the context.
//! One event is recorded per group and per detected loop.

use crate::{
    compiler::{pass::Pass, CompilerContext, ControlTree, EventKind},
    ir::{Function, FunctionId},
    Result,
};

/// Reconstructs structured control flow.
pub struct StructuringPass;

impl Default for StructuringPass {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuringPass {
    /// Creates a new structuring pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for StructuringPass {
    fn name(&self) -> &'static str {
        "structuring"
    }

    fn description(&self) -> &'static str {
        "Groups blocks into nested if/loop regions with explicit jumps"
    }

    fn run_on_function(
        &self,
        func: &mut Function,
        function: FunctionId,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let tree = ControlTree::build(func)?;

        for (id, group) in tree.groups() {
            let kind = if group.is_loop_head() {
                EventKind::LoopDetected
            } else {
                EventKind::GroupStructured
            };
            ctx.events
                .record(kind)
                .at(function, group.entry().index())
                .message(format!("{id} entered at {}", group.entry()))
                .pass(self.name());
        }

        ctx.set_control_tree(function, tree);
        Ok(false)
    }
}
