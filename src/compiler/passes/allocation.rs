//! Slot allocation pass.
//!
//! Colors the interference graph of a function and stores the resulting
//! [`SlotAssignment`](crate::compiler::SlotAssignment) in the context. The
//! function itself is not modified.

use crate::{
    compiler::{pass::Pass, CompilerContext, EventKind, SlotAllocator},
    ir::{Function, FunctionId},
    Result,
};

/// Assigns a slot to every slot-resident value.
pub struct AllocationPass;

impl Default for AllocationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationPass {
    /// Creates a new allocation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for AllocationPass {
    fn name(&self) -> &'static str {
        "allocation"
    }

    fn description(&self) -> &'static str {
        "Assigns slots to values by coloring the interference graph"
    }

    fn run_on_function(
        &self,
        func: &mut Function,
        function: FunctionId,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let assignment = SlotAllocator::new()
            .with_coalescing(ctx.config.coalesce_phi_slots)
            .allocate_function(func)?;

        ctx.events
            .record(EventKind::SlotsAssigned)
            .function(function)
            .message(format!(
                "{} value(s) in {} slot(s)",
                assignment.len(),
                assignment.slot_count()
            ))
            .pass(self.name());
        ctx.set_slot_assignment(function, assignment);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::SsaPromoter, test::build_counter};

    #[test]
    fn test_stores_assignment() {
        let mut func = build_counter().func;
        SsaPromoter::new().promote_all(&mut func).unwrap();
        let ctx = CompilerContext::default();
        let id = FunctionId::new(3);

        assert!(!AllocationPass::new()
            .run_on_function(&mut func, id, &ctx)
            .unwrap());
        let assignment = ctx.slot_assignment(id).unwrap();
        assert!(!assignment.is_empty());
        assert_eq!(ctx.events.count_kind(EventKind::SlotsAssigned), 1);
    }
}
