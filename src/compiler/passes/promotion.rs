//! SSA promotion pass.
//!
//! Runs the [`SsaPromoter`] over every cell of a function and records one
//! event per promoted cell, inserted phi and deleted instruction. Cells that
//! stay in memory are logged at trace level only.

use crate::{
    analysis::{Outcome, Promotion, SsaPromoter},
    compiler::{pass::Pass, CompilerContext, EventKind, EventLog},
    ir::{Function, FunctionId},
    Result,
};

/// Reference-cell to SSA promotion.
pub struct PromotionPass;

impl Default for PromotionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl PromotionPass {
    /// Creates a new promotion pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for PromotionPass {
    fn name(&self) -> &'static str {
        "promotion"
    }

    fn description(&self) -> &'static str {
        "Promotes reference cells to SSA values with pruned phi placement"
    }

    fn run_on_function(
        &self,
        func: &mut Function,
        function: FunctionId,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let promoter = SsaPromoter::new().with_captured(ctx.config.promote_captured_cells);
        let changes = EventLog::new();

        for cell in SsaPromoter::cells(func)? {
            let block = func.instruction(cell)?.block();
            let before = func.instruction_ids().count();

            match promoter.promote_cell(func, cell)? {
                Outcome::Promoted(promotion) => {
                    changes
                        .record(EventKind::CellPromoted)
                        .at(function, block.index())
                        .message(format!("{cell}: {promotion:?}"))
                        .pass(self.name());

                    if let Promotion::Global { phis } = promotion {
                        for _ in 0..phis {
                            changes
                                .record(EventKind::PhiInserted)
                                .at(function, block.index())
                                .message(format!("phi for {cell}"))
                                .pass(self.name());
                        }
                    }

                    let removed = before.saturating_sub(func.instruction_ids().count());
                    for _ in 0..removed {
                        changes
                            .record(EventKind::InstructionRemoved)
                            .at(function, block.index())
                            .message(format!("use of {cell}"))
                            .pass(self.name());
                    }
                }
                Outcome::Skipped(reason) => {
                    log::trace!("{}: {} stays in memory ({})", func.name(), cell, reason);
                }
            }
        }

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(&changes);
        }
        Ok(changed)
    }
}
