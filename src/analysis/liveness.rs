//! Block-granularity liveness of slot-resident values.
//!
//! A value's live-block set contains its defining block, every block with a
//! consuming instruction, and every predecessor that feeds it to a phi,
//! closed backwards over predecessor edges up to the defining block.
//! Arguments are defined before the entry block, so when the entry has
//! predecessors their liveness continues around those edges. Once
//! live in a block a value keeps its slot for the whole block, except that
//! [`Liveness::last_use`] bounds where the slot frees up inside it.
//!
//! Only *candidates* are tracked: Value-kind values defined by an
//! instruction, an argument or a phi in a reachable block. Cells and tuples
//! never get a slot.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::{
    analysis::Dominance,
    ir::{Function, User, ValueDef, ValueId, ValueKind},
    utils::graph::NodeId,
    Result,
};

/// Live-block sets of every candidate value of a function.
#[derive(Debug, Clone)]
pub struct Liveness {
    candidates: Vec<ValueId>,
    def_blocks: FxHashMap<ValueId, NodeId>,
    /// Candidates defined on function entry rather than inside a block.
    arguments: BTreeSet<ValueId>,
    /// Reachable blocks branching back to the entry.
    entry_predecessors: Vec<NodeId>,
    live_blocks: FxHashMap<ValueId, BTreeSet<NodeId>>,
    /// Values each block hands to a successor's phi.
    phi_outputs: FxHashMap<NodeId, BTreeSet<ValueId>>,
    successors: FxHashMap<NodeId, Vec<NodeId>>,
    /// Last instruction consuming a value inside a block, or else the phi
    /// it leaves the block through.
    last_uses: FxHashMap<(ValueId, NodeId), User>,
}

impl Liveness {
    /// Computes liveness for every candidate of `func`.
    ///
    /// # Errors
    ///
    /// Returns an error if dominance cannot be computed or the function holds
    /// stale handles.
    pub fn compute(func: &mut Function) -> Result<Self> {
        let dom = func.dominance()?;
        Self::with_dominance(func, &dom)
    }

    /// Computes liveness against already validated dominance.
    ///
    /// # Errors
    ///
    /// Returns an error if the function holds stale handles.
    pub fn with_dominance(func: &Function, dom: &Dominance) -> Result<Self> {
        let mut candidates = Vec::new();
        let mut def_blocks = FxHashMap::default();
        let mut arguments = BTreeSet::new();
        for value in func.value_ids() {
            if let Some(block) = candidate_block(func, dom, value)? {
                candidates.push(value);
                def_blocks.insert(value, block);
                if matches!(func.value(value)?.def(), ValueDef::Argument(_)) {
                    arguments.insert(value);
                }
            }
        }
        let entry_predecessors: Vec<NodeId> = dom
            .graph()
            .predecessor_list(func.entry())
            .iter()
            .copied()
            .filter(|&pred| dom.is_reachable(pred))
            .collect();

        let mut seeds: FxHashMap<ValueId, BTreeSet<NodeId>> = FxHashMap::default();
        let mut phi_outputs: FxHashMap<NodeId, BTreeSet<ValueId>> = FxHashMap::default();
        let mut last_uses = FxHashMap::default();
        let mut successors = FxHashMap::default();

        for &block in dom.reachable_blocks() {
            let data = func.block(block)?;
            for &phi in data.phis() {
                for (&pred, &source) in func.phi(phi)?.sources() {
                    if def_blocks.contains_key(&source) && dom.is_reachable(pred) {
                        seeds.entry(source).or_default().insert(pred);
                        phi_outputs.entry(pred).or_default().insert(source);
                        last_uses.entry((source, pred)).or_insert(User::Phi(phi));
                    }
                }
            }
            for &inst in data.instructions() {
                for &operand in func.instruction(inst)?.operands() {
                    if def_blocks.contains_key(&operand) {
                        seeds.entry(operand).or_default().insert(block);
                        last_uses.insert((operand, block), User::Inst(inst));
                    }
                }
            }

            let mut distinct = Vec::new();
            for &succ in dom.graph().successor_list(block) {
                if !distinct.contains(&succ) {
                    distinct.push(succ);
                }
            }
            successors.insert(block, distinct);
        }

        let mut live_blocks = FxHashMap::default();
        for &value in &candidates {
            let def = def_blocks[&value];
            let mut live = if arguments.contains(&value) {
                BTreeSet::new()
            } else {
                BTreeSet::from([def])
            };
            let mut worklist = Vec::new();
            for &block in seeds.get(&value).into_iter().flatten() {
                if live.insert(block) {
                    worklist.push(block);
                }
            }
            while let Some(block) = worklist.pop() {
                for &pred in dom.graph().predecessor_list(block) {
                    if dom.is_reachable(pred) && live.insert(pred) {
                        worklist.push(pred);
                    }
                }
            }
            live.insert(def);
            live_blocks.insert(value, live);
        }

        log::trace!(
            "{}: liveness for {} candidate value(s)",
            func.name(),
            candidates.len()
        );
        Ok(Self {
            candidates,
            def_blocks,
            arguments,
            entry_predecessors,
            live_blocks,
            phi_outputs,
            successors,
            last_uses,
        })
    }

    /// Returns the candidate values in id order.
    #[must_use]
    pub fn candidates(&self) -> &[ValueId] {
        &self.candidates
    }

    /// Returns `true` if `value` is tracked.
    #[must_use]
    pub fn is_candidate(&self, value: ValueId) -> bool {
        self.def_blocks.contains_key(&value)
    }

    /// Returns the block defining `value`.
    #[must_use]
    pub fn def_block(&self, value: ValueId) -> Option<NodeId> {
        self.def_blocks.get(&value).copied()
    }

    /// Returns the live-block set of `value`.
    #[must_use]
    pub fn live_blocks(&self, value: ValueId) -> Option<&BTreeSet<NodeId>> {
        self.live_blocks.get(&value)
    }

    /// Returns `true` if `value` is live at any point of `block`.
    #[must_use]
    pub fn is_live_in_block(&self, value: ValueId, block: NodeId) -> bool {
        self.live_blocks
            .get(&value)
            .is_some_and(|live| live.contains(&block))
    }

    /// Returns `true` if `value` is live on entry to `block`.
    #[must_use]
    pub fn is_live_in(&self, value: ValueId, block: NodeId) -> bool {
        if !self.is_live_in_block(value, block) {
            return false;
        }
        if self.def_blocks.get(&value) != Some(&block) {
            return true;
        }
        self.arguments.contains(&value)
            && self
                .entry_predecessors
                .iter()
                .any(|&pred| self.is_live_in_block(value, pred))
    }

    /// Returns `true` if `value` is live on exit from `block`.
    #[must_use]
    pub fn is_live_out(&self, value: ValueId, block: NodeId) -> bool {
        if !self.is_live_in_block(value, block) {
            return false;
        }
        if self
            .phi_outputs
            .get(&block)
            .is_some_and(|out| out.contains(&value))
        {
            return true;
        }
        self.successors
            .get(&block)
            .into_iter()
            .flatten()
            .any(|&succ| self.is_live_in(value, succ))
    }

    /// Returns the values live on entry to `block`, in id order.
    #[must_use]
    pub fn live_in(&self, block: NodeId) -> Vec<ValueId> {
        self.candidates
            .iter()
            .copied()
            .filter(|&v| self.is_live_in(v, block))
            .collect()
    }

    /// Returns the values live on exit from `block`, in id order.
    #[must_use]
    pub fn live_out(&self, block: NodeId) -> Vec<ValueId> {
        self.candidates
            .iter()
            .copied()
            .filter(|&v| self.is_live_out(v, block))
            .collect()
    }

    /// Returns the last consumer of `value` inside `block`.
    ///
    /// Instructions are searched backwards from the terminator. When none
    /// consumes the value, a successor's phi taking it from `block` is
    /// reported instead.
    #[must_use]
    pub fn last_use(&self, value: ValueId, block: NodeId) -> Option<User> {
        self.last_uses.get(&(value, block)).copied()
    }
}

/// Returns the defining block of `value` if it is an allocation candidate.
fn candidate_block(func: &Function, dom: &Dominance, value: ValueId) -> Result<Option<NodeId>> {
    let data = func.value(value)?;
    if data.kind() != ValueKind::Value || !data.def().is_slot_resident() {
        return Ok(None);
    }
    let block = match data.def() {
        ValueDef::Argument(_) => Some(func.entry()),
        _ => func.def_block(value)?,
    };
    Ok(block.filter(|&b| dom.is_reachable(b)))
}
