//! Basic blocks.
//!
//! A block is an ordered instruction sequence plus a set of phi nodes.
//! Predecessors are not stored: they are derived from the terminators of the
//! other blocks. Dominance information is kept by the owning function in a
//! single cached [`Dominance`](crate::analysis::Dominance) rather than spread
//! across blocks, so invalidating it is one assignment.

use crate::ir::{InstId, PhiId};

/// A basic block in a function's arena.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub(crate) instructions: Vec<InstId>,
    pub(crate) phis: Vec<PhiId>,
}

impl Block {
    /// Returns the instruction sequence, terminator last.
    #[must_use]
    pub fn instructions(&self) -> &[InstId] {
        &self.instructions
    }

    /// Returns the phi nodes of the block, in creation order.
    #[must_use]
    pub fn phis(&self) -> &[PhiId] {
        &self.phis
    }

    /// Returns the last instruction of the block, if any.
    #[must_use]
    pub fn last(&self) -> Option<InstId> {
        self.instructions.last().copied()
    }

    /// Returns `true` if the block holds neither instructions nor phis.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.phis.is_empty()
    }

    /// Returns the position of `inst` in the sequence.
    #[must_use]
    pub fn position(&self, inst: InstId) -> Option<usize> {
        self.instructions.iter().position(|&i| i == inst)
    }
}
