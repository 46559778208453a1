//! Unreachable block elimination.
//!
//! Deletes every block the entry cannot reach, together with its phis and
//! instructions, and drops phi sources for the removed predecessors.

use crate::{
    compiler::{pass::Pass, CompilerContext, EventKind},
    ir::{Function, FunctionId},
    Result,
};

/// Removes blocks unreachable from the function entry.
pub struct UnreachableBlockPass;

impl Default for UnreachableBlockPass {
    fn default() -> Self {
        Self::new()
    }
}

impl UnreachableBlockPass {
    /// Creates a new unreachable block pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for UnreachableBlockPass {
    fn name(&self) -> &'static str {
        "unreachable-blocks"
    }

    fn description(&self) -> &'static str {
        "Removes blocks unreachable from the function entry"
    }

    fn run_on_function(
        &self,
        func: &mut Function,
        function: FunctionId,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let removed = func.remove_unreachable_blocks()?;
        for block in &removed {
            ctx.events
                .record(EventKind::BlockRemoved)
                .at(function, block.index())
                .message(format!("{block} is unreachable"))
                .pass(self.name());
        }
        Ok(!removed.is_empty())
    }
}
