//! Phi nodes.
//!
//! A phi selects one incoming value per predecessor edge of its block. Phis
//! are evaluated simultaneously at block entry, before any instruction of the
//! block runs.
//!
//! After SSA promotion every phi has exactly one source per reachable
//! predecessor of its block. The source map is ordered by predecessor so that
//! listings and downstream passes see a stable order.

use std::{collections::BTreeMap, fmt};

use crate::{ir::ValueId, utils::graph::NodeId};

/// A strongly-typed phi identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhiId(pub(crate) usize);

impl PhiId {
    /// Creates a phi identifier from an arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        PhiId(index)
    }

    /// Returns the underlying arena index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for PhiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhiId({})", self.0)
    }
}

impl fmt::Display for PhiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A phi node owned by exactly one block.
#[derive(Debug, Clone)]
pub struct Phi {
    pub(crate) block: NodeId,
    pub(crate) result: ValueId,
    pub(crate) sources: BTreeMap<NodeId, ValueId>,
}

impl Phi {
    /// Returns the owning block.
    #[must_use]
    pub fn block(&self) -> NodeId {
        self.block
    }

    /// Returns the value this phi defines.
    #[must_use]
    pub fn result(&self) -> ValueId {
        self.result
    }

    /// Returns the predecessor → incoming value map.
    #[must_use]
    pub fn sources(&self) -> &BTreeMap<NodeId, ValueId> {
        &self.sources
    }

    /// Returns the value flowing in from `pred`, if recorded.
    #[must_use]
    pub fn source(&self, pred: NodeId) -> Option<ValueId> {
        self.sources.get(&pred).copied()
    }
}
