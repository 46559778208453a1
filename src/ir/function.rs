//! Functions: the arena that owns blocks, instructions, phis and values.
//!
//! All cross references inside a function are arena handles ([`NodeId`],
//! [`InstId`], [`PhiId`], [`ValueId`]). Removing an entry leaves a tombstone,
//! so handles held elsewhere never silently point at a different entity; a
//! stale handle is reported as one of the `*NotFound` errors instead.
//!
//! # Dominance caching
//!
//! Dominance is derived state. It is computed on demand by
//! [`Function::dominance`] and cached as an `Arc<Dominance>`. Every edit that
//! can change the block graph (adding or removing blocks, adding, removing
//! or retargeting terminators, moving the entry) drops the cache. Nothing
//! else reads or writes it.
//!
//! # Use lists
//!
//! Each value keeps a multiset of its consumers. Every mutator in this module
//! keeps operand lists, phi source maps and use lists in sync; the
//! [verifier](Function::verify) checks that they are.

use std::{collections::BTreeMap, fmt, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{
    analysis::Dominance,
    ir::{
        Block, Capture, ConstantId, ConstantPool, InstId, Instruction, Literal, Opcode, Phi,
        PhiId, User, Value, ValueDef, ValueId, ValueKind,
    },
    utils::{
        graph::{algorithms::preorder, GraphBase, NodeId, Predecessors, RootedGraph, Successors},
        BitSet,
    },
    Error, Result,
};

/// Default safety cap on dominator fixpoint traversals.
pub const DEFAULT_DOMINANCE_LIMIT: usize = 1024;

/// A function body in block-graph form.
///
/// A new function starts with a single empty entry block.
///
/// # Examples
///
/// ```rust,ignore
/// use irscope::prelude::*;
///
/// let mut pool = ConstantPool::new();
/// let mut func = Function::new("answer");
/// let entry = func.entry();
/// let value = func.constant(&mut pool, 42i64);
/// func.ret(entry, &[value])?;
/// func.verify()?;
/// ```
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    entry: NodeId,
    pub(crate) blocks: Vec<Option<Block>>,
    pub(crate) instructions: Vec<Option<Instruction>>,
    pub(crate) phis: Vec<Option<Phi>>,
    pub(crate) values: Vec<Option<Value>>,
    arguments: Vec<ValueId>,
    variadic: bool,
    open_upvalues: Vec<ValueId>,
    closed_upvalues: Vec<ValueId>,
    constants: FxHashMap<ConstantId, ValueId>,
    dominance: Option<Arc<Dominance>>,
    dominance_limit: usize,
}

impl Function {
    /// Creates a function with one empty entry block.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry: NodeId::new(0),
            blocks: vec![Some(Block::default())],
            instructions: Vec::new(),
            phis: Vec::new(),
            values: Vec::new(),
            arguments: Vec::new(),
            variadic: false,
            open_upvalues: Vec::new(),
            closed_upvalues: Vec::new(),
            constants: FxHashMap::default(),
            dominance: None,
            dominance_limit: DEFAULT_DOMINANCE_LIMIT,
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entry block.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Moves the entry to another block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] if `block` does not exist.
    pub fn set_entry(&mut self, block: NodeId) -> Result<()> {
        self.block(block)?;
        self.entry = block;
        self.invalidate_dominance();
        Ok(())
    }

    // ── Arena access ────────────────────────────────────────────────────

    /// Returns a block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] for removed or unknown blocks.
    pub fn block(&self, id: NodeId) -> Result<&Block> {
        self.blocks
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::BlockNotFound(id))
    }

    fn block_mut(&mut self, id: NodeId) -> Result<&mut Block> {
        self.blocks
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Error::BlockNotFound(id))
    }

    /// Returns `true` if `id` names a live block.
    #[must_use]
    pub fn has_block(&self, id: NodeId) -> bool {
        self.block(id).is_ok()
    }

    /// Iterates over the live blocks in arena order.
    pub fn block_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_some())
            .map(|(i, _)| NodeId::new(i))
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    /// Returns an instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstructionNotFound`] for removed or unknown instructions.
    pub fn instruction(&self, id: InstId) -> Result<&Instruction> {
        self.instructions
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::InstructionNotFound(id))
    }

    fn instruction_mut(&mut self, id: InstId) -> Result<&mut Instruction> {
        self.instructions
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Error::InstructionNotFound(id))
    }

    /// Iterates over all live instructions in arena order.
    pub fn instruction_ids(&self) -> impl Iterator<Item = InstId> + '_ {
        self.instructions
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_some())
            .map(|(i, _)| InstId::new(i))
    }

    /// Returns a phi node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PhiNotFound`] for removed or unknown phis.
    pub fn phi(&self, id: PhiId) -> Result<&Phi> {
        self.phis
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::PhiNotFound(id))
    }

    fn phi_mut(&mut self, id: PhiId) -> Result<&mut Phi> {
        self.phis
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Error::PhiNotFound(id))
    }

    /// Iterates over all live phis in arena order.
    pub fn phi_ids(&self) -> impl Iterator<Item = PhiId> + '_ {
        self.phis
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .map(|(i, _)| PhiId::new(i))
    }

    /// Returns a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueNotFound`] for destroyed or unknown values.
    pub fn value(&self, id: ValueId) -> Result<&Value> {
        self.values
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::ValueNotFound(id))
    }

    fn value_mut(&mut self, id: ValueId) -> Result<&mut Value> {
        self.values
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Error::ValueNotFound(id))
    }

    /// Iterates over all live values in arena order.
    pub fn value_ids(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| ValueId::new(i))
    }

    /// Returns the block a value is defined in.
    ///
    /// Arguments are defined in the entry block. Constants and upvalues are
    /// not defined in any block.
    ///
    /// # Errors
    ///
    /// Returns a `*NotFound` error if the value or its definition is gone.
    pub fn def_block(&self, id: ValueId) -> Result<Option<NodeId>> {
        Ok(match self.value(id)?.def() {
            ValueDef::Instruction(inst) => Some(self.instruction(inst)?.block),
            ValueDef::Phi(phi) => Some(self.phi(phi)?.block),
            ValueDef::Argument(_) => Some(self.entry),
            ValueDef::Constant(_) | ValueDef::Upvalue(..) => None,
        })
    }

    /// Returns the block a user lives in.
    ///
    /// # Errors
    ///
    /// Returns a `*NotFound` error if the user is gone.
    pub fn user_block(&self, user: User) -> Result<NodeId> {
        match user {
            User::Inst(inst) => Ok(self.instruction(inst)?.block),
            User::Phi(phi) => Ok(self.phi(phi)?.block),
        }
    }

    fn new_value(&mut self, kind: ValueKind, def: ValueDef) -> ValueId {
        let id = ValueId::new(self.values.len());
        self.values.push(Some(Value::new(kind, def)));
        id
    }

    // ── Signature ───────────────────────────────────────────────────────

    /// Declares the next argument.
    pub fn add_argument(&mut self) -> ValueId {
        let index = self.arguments.len();
        let id = self.new_value(ValueKind::Value, ValueDef::Argument(index));
        self.arguments.push(id);
        id
    }

    /// Returns the declared arguments in order.
    #[must_use]
    pub fn arguments(&self) -> &[ValueId] {
        &self.arguments
    }

    /// Marks the function as accepting variadic arguments.
    pub fn set_variadic(&mut self, variadic: bool) {
        self.variadic = variadic;
    }

    /// Returns `true` if the function accepts variadic arguments.
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Declares the next upvalue of the given capture mode.
    ///
    /// Open upvalues are Reference-kind, closed upvalues Value-kind.
    pub fn add_upvalue(&mut self, capture: Capture) -> ValueId {
        let list = match capture {
            Capture::Open => &self.open_upvalues,
            Capture::Closed => &self.closed_upvalues,
        };
        let index = list.len();
        let id = self.new_value(capture.kind(), ValueDef::Upvalue(capture, index));
        match capture {
            Capture::Open => self.open_upvalues.push(id),
            Capture::Closed => self.closed_upvalues.push(id),
        }
        id
    }

    /// Returns the upvalues captured by reference.
    #[must_use]
    pub fn open_upvalues(&self) -> &[ValueId] {
        &self.open_upvalues
    }

    /// Returns the upvalues captured by copy.
    #[must_use]
    pub fn closed_upvalues(&self) -> &[ValueId] {
        &self.closed_upvalues
    }

    /// Returns this function's value for a literal, interning it in `pool`.
    ///
    /// Repeated requests for equal literals return the same value.
    pub fn constant(&mut self, pool: &mut ConstantPool, literal: impl Into<Literal>) -> ValueId {
        let id = pool.intern(literal);
        if let Some(&value) = self.constants.get(&id) {
            if self.value(value).is_ok() {
                return value;
            }
        }
        let value = self.new_value(ValueKind::Value, ValueDef::Constant(id));
        self.constants.insert(id, value);
        value
    }

    /// Returns the cached value for an interned constant, if this function uses it.
    #[must_use]
    pub fn constant_value(&self, id: ConstantId) -> Option<ValueId> {
        self.constants.get(&id).copied()
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    /// Adds an empty block.
    pub fn add_block(&mut self) -> NodeId {
        let id = NodeId::new(self.blocks.len());
        self.blocks.push(Some(Block::default()));
        self.invalidate_dominance();
        id
    }

    /// Returns the terminator of a block, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] if `block` does not exist.
    pub fn terminator(&self, block: NodeId) -> Result<Option<InstId>> {
        let Some(last) = self.block(block)?.last() else {
            return Ok(None);
        };
        Ok(self.instruction(last)?.is_terminator().then_some(last))
    }

    fn terminator_opcode(&self, block: NodeId) -> Option<Opcode> {
        let inst = self.terminator(block).ok().flatten()?;
        self.instruction(inst).ok().map(Instruction::opcode)
    }

    /// Removes a block with no remaining predecessors.
    ///
    /// The block's instructions and phis are discarded and its outgoing edges
    /// are dropped from the phi source maps of its successors.
    ///
    /// # Errors
    ///
    /// - an invariant error if `block` is the entry or is still targeted by
    ///   another block's terminator
    /// - [`Error::ValueInUse`] if a value defined in the block is consumed
    ///   outside it
    pub fn remove_block(&mut self, block: NodeId) -> Result<()> {
        if block == self.entry {
            return Err(invariant_error!("Cannot remove entry block {}", block));
        }
        let data = self.block(block)?.clone();

        if let Some(pred) = self.predecessors(block).find(|&p| p != block) {
            return Err(invariant_error!(
                "Cannot remove block {} while {} still branches to it",
                block,
                pred
            ));
        }

        let results = data
            .instructions
            .iter()
            .filter_map(|&inst| self.instruction(inst).ok().and_then(Instruction::result))
            .chain(data.phis.iter().filter_map(|&phi| self.phi(phi).ok().map(Phi::result)));
        for value in results.collect::<Vec<_>>() {
            let v = self.value(value)?;
            for (user, _) in v.users() {
                if self.user_block(user)? != block {
                    return Err(Error::ValueInUse(value, v.unique_users()));
                }
            }
        }

        let successors: Vec<NodeId> = self.successors(block).collect();
        self.discard_block(block)?;
        for succ in successors {
            self.drop_edge_sources(block, succ)?;
        }
        self.invalidate_dominance();
        Ok(())
    }

    /// Rewrites the edges of `block`'s terminator that go to `from` so that
    /// they go to `to`. Returns the number of edges rewritten.
    ///
    /// Phi sources are not touched.
    ///
    /// # Errors
    ///
    /// Returns an error if either block is missing or `block` has no terminator.
    pub fn retarget(&mut self, block: NodeId, from: NodeId, to: NodeId) -> Result<usize> {
        self.block(to)?;
        let term = self
            .terminator(block)?
            .ok_or_else(|| invariant_error!("Block {} has no terminator to retarget", block))?;
        let changed = self.instruction_mut(term)?.opcode.retarget(from, to);
        if changed > 0 {
            self.invalidate_dominance();
        }
        Ok(changed)
    }

    /// Returns the blocks reachable from the entry, in depth-first preorder.
    #[must_use]
    pub fn reachable_blocks(&self) -> Vec<NodeId> {
        preorder(self, self.entry)
    }

    /// Removes every block not reachable from the entry.
    ///
    /// This is the one place values are force-destroyed: unreachable code may
    /// still reference itself, which the checked removal paths would refuse.
    /// Phi sources coming from removed blocks are dropped.
    ///
    /// Returns the removed blocks in arena order.
    ///
    /// # Errors
    ///
    /// Returns an error only if the arena is internally inconsistent.
    pub fn remove_unreachable_blocks(&mut self) -> Result<Vec<NodeId>> {
        let reachable: BitSet = self
            .reachable_blocks()
            .into_iter()
            .map(NodeId::index)
            .collect();
        let dead: Vec<NodeId> = self
            .block_ids()
            .filter(|b| !reachable.contains(b.index()))
            .collect();
        if dead.is_empty() {
            return Ok(dead);
        }

        for &block in &dead {
            let successors: Vec<NodeId> = self.successors(block).collect();
            for succ in successors {
                if reachable.contains(succ.index()) {
                    self.drop_edge_sources(block, succ)?;
                }
            }
        }
        for &block in &dead {
            self.discard_block(block)?;
        }

        log::debug!("{}: removed {} unreachable block(s)", self.name, dead.len());
        self.invalidate_dominance();
        Ok(dead)
    }

    /// Drops the sources keyed by `pred` from every phi of `block`.
    fn drop_edge_sources(&mut self, pred: NodeId, block: NodeId) -> Result<()> {
        let Ok(data) = self.block(block) else {
            return Ok(());
        };
        for phi in data.phis.clone() {
            self.remove_phi_source(phi, pred)?;
        }
        Ok(())
    }

    /// Tombstones a block and everything in it, releasing operand uses.
    fn discard_block(&mut self, block: NodeId) -> Result<()> {
        let Some(data) = self.blocks.get_mut(block.index()).and_then(Option::take) else {
            return Err(Error::BlockNotFound(block));
        };

        for phi in data.phis {
            let Some(phi_data) = self.phis.get_mut(phi.index()).and_then(Option::take) else {
                continue;
            };
            for source in phi_data.sources.values() {
                if let Ok(value) = self.value_mut(*source) {
                    value.take_uses(User::Phi(phi));
                }
            }
            self.force_destroy(phi_data.result)?;
        }

        for inst in data.instructions {
            let Some(inst_data) = self.instructions.get_mut(inst.index()).and_then(Option::take)
            else {
                continue;
            };
            for operand in &inst_data.operands {
                if let Ok(value) = self.value_mut(*operand) {
                    value.take_uses(User::Inst(inst));
                }
            }
            if let Some(result) = inst_data.result {
                self.force_destroy(result)?;
            }
        }
        Ok(())
    }

    // ── Instructions ────────────────────────────────────────────────────

    /// Appends an instruction to the end of a block.
    ///
    /// # Arguments
    ///
    /// * `block` - The block to append to
    /// * `opcode` - The instruction opcode
    /// * `operands` - Operands, following the conventions in [`crate::ir::instruction`]
    ///
    /// # Errors
    ///
    /// - [`Error::TerminatorExists`] if the block already ends in a terminator
    /// - an invariant error on wrong arity, a non-Reference cell operand, or a
    ///   branch to a missing block
    /// - a `*NotFound` error for stale handles
    pub fn append(&mut self, block: NodeId, opcode: Opcode, operands: Vec<ValueId>) -> Result<InstId> {
        if self.terminator(block)?.is_some() {
            return Err(Error::TerminatorExists(block));
        }
        let position = self.block(block)?.instructions.len();
        self.insert_at(block, position, opcode, operands)
    }

    /// Inserts a non-terminator instruction immediately before `before`.
    ///
    /// # Errors
    ///
    /// Returns an invariant error if `opcode` is a terminator, plus the errors
    /// of [`Function::append`].
    pub fn insert_before(
        &mut self,
        before: InstId,
        opcode: Opcode,
        operands: Vec<ValueId>,
    ) -> Result<InstId> {
        if opcode.is_terminator() {
            return Err(invariant_error!(
                "Cannot insert terminator '{}' before {}",
                opcode,
                before
            ));
        }
        let block = self.instruction(before)?.block;
        let position = self
            .block(block)?
            .position(before)
            .ok_or_else(|| invariant_error!("{} is not sequenced in {}", before, block))?;
        self.insert_at(block, position, opcode, operands)
    }

    fn insert_at(
        &mut self,
        block: NodeId,
        position: usize,
        opcode: Opcode,
        operands: Vec<ValueId>,
    ) -> Result<InstId> {
        if !opcode.arity().accepts(operands.len()) {
            return Err(invariant_error!(
                "'{}' does not accept {} operand(s)",
                opcode,
                operands.len()
            ));
        }
        for &operand in &operands {
            self.value(operand)?;
        }
        if matches!(opcode, Opcode::GetRef | Opcode::SetRef) {
            let cell = operands[0];
            if self.value(cell)?.kind() != ValueKind::Reference {
                return Err(invariant_error!(
                    "'{}' operand {} is not a reference",
                    opcode,
                    cell
                ));
            }
        }
        for target in opcode.targets() {
            self.block(target)?;
        }

        let id = InstId::new(self.instructions.len());
        let result = opcode
            .result_kind()
            .map(|kind| self.new_value(kind, ValueDef::Instruction(id)));
        for &operand in &operands {
            self.value_mut(operand)?.add_use(User::Inst(id), 1);
        }
        self.instructions.push(Some(Instruction {
            opcode,
            operands,
            result,
            block,
        }));
        self.block_mut(block)?.instructions.insert(position, id);

        if opcode.is_terminator() {
            self.invalidate_dominance();
        }
        Ok(id)
    }

    /// Removes an instruction whose result (if any) has no consumers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueInUse`] if the result is still consumed.
    pub fn remove_instruction(&mut self, inst: InstId) -> Result<()> {
        let data = self.instruction(inst)?;
        if let Some(result) = data.result {
            let value = self.value(result)?;
            if !value.is_unused() {
                return Err(Error::ValueInUse(result, value.unique_users()));
            }
        }

        let Some(data) = self.instructions.get_mut(inst.index()).and_then(Option::take) else {
            return Err(Error::InstructionNotFound(inst));
        };
        for operand in &data.operands {
            if let Ok(value) = self.value_mut(*operand) {
                value.take_uses(User::Inst(inst));
            }
        }
        if let Some(result) = data.result {
            self.force_destroy(result)?;
        }
        if let Ok(block) = self.block_mut(data.block) {
            block.instructions.retain(|&i| i != inst);
        }
        if data.opcode.is_terminator() {
            self.invalidate_dominance();
        }
        Ok(())
    }

    /// Replaces operand `index` of `inst` with `value`.
    ///
    /// # Errors
    ///
    /// Returns an invariant error if `index` is out of range, or a
    /// `*NotFound` error for stale handles.
    pub fn set_operand(&mut self, inst: InstId, index: usize, value: ValueId) -> Result<()> {
        self.value(value)?;
        let old = *self
            .instruction(inst)?
            .operands
            .get(index)
            .ok_or_else(|| invariant_error!("{} has no operand {}", inst, index))?;
        if old == value {
            return Ok(());
        }
        if let Ok(old_value) = self.value_mut(old) {
            old_value.remove_use(User::Inst(inst));
        }
        self.value_mut(value)?.add_use(User::Inst(inst), 1);
        self.instruction_mut(inst)?.operands[index] = value;
        Ok(())
    }

    /// Replaces every use of `old` with `new`.
    ///
    /// Walks `old`'s use multiset once, substituting in each consumer and
    /// moving the use counts from `old` to `new`. Returns the number of
    /// operand and phi-source slots rewritten.
    ///
    /// # Errors
    ///
    /// Returns a `*NotFound` error if either value or a recorded user is gone.
    pub fn replace_all_uses(&mut self, old: ValueId, new: ValueId) -> Result<usize> {
        if old == new {
            return Ok(0);
        }
        self.value(new)?;
        let users: Vec<(User, usize)> = self.value(old)?.users().collect();

        let mut replaced = 0;
        for (user, count) in users {
            match user {
                User::Inst(inst) => {
                    for operand in &mut self.instruction_mut(inst)?.operands {
                        if *operand == old {
                            *operand = new;
                            replaced += 1;
                        }
                    }
                }
                User::Phi(phi) => {
                    for source in self.phi_mut(phi)?.sources.values_mut() {
                        if *source == old {
                            *source = new;
                            replaced += 1;
                        }
                    }
                }
            }
            self.value_mut(old)?.take_uses(user);
            self.value_mut(new)?.add_use(user, count);
        }
        Ok(replaced)
    }

    /// Destroys a value without checking for remaining consumers.
    ///
    /// Consumers are left holding a dead handle. Only meant for discarding
    /// code that is itself being removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueNotFound`] if the value is already gone.
    pub fn force_destroy(&mut self, value: ValueId) -> Result<()> {
        let slot = self
            .values
            .get_mut(value.index())
            .ok_or(Error::ValueNotFound(value))?;
        let Some(data) = slot.take() else {
            return Err(Error::ValueNotFound(value));
        };
        if let ValueDef::Constant(id) = data.def() {
            self.constants.remove(&id);
        }
        Ok(())
    }

    // ── Phis ────────────────────────────────────────────────────────────

    /// Adds a phi with an empty source map to `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] if `block` does not exist.
    pub fn add_phi(&mut self, block: NodeId) -> Result<PhiId> {
        self.block(block)?;
        let id = PhiId::new(self.phis.len());
        let result = self.new_value(ValueKind::Value, ValueDef::Phi(id));
        self.phis.push(Some(Phi {
            block,
            result,
            sources: BTreeMap::new(),
        }));
        self.block_mut(block)?.phis.push(id);
        Ok(id)
    }

    /// Sets the value flowing into `phi` from `pred`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a `*NotFound` error for stale handles.
    pub fn set_phi_source(&mut self, phi: PhiId, pred: NodeId, value: ValueId) -> Result<()> {
        self.value(value)?;
        self.block(pred)?;
        let old = self.phi_mut(phi)?.sources.insert(pred, value);
        if let Some(old) = old {
            if let Ok(old_value) = self.value_mut(old) {
                old_value.remove_use(User::Phi(phi));
            }
        }
        self.value_mut(value)?.add_use(User::Phi(phi), 1);
        Ok(())
    }

    /// Removes the source for `pred` from `phi`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PhiNotFound`] if the phi is gone.
    pub fn remove_phi_source(&mut self, phi: PhiId, pred: NodeId) -> Result<Option<ValueId>> {
        let old = self.phi_mut(phi)?.sources.remove(&pred);
        if let Some(old) = old {
            if let Ok(value) = self.value_mut(old) {
                value.remove_use(User::Phi(phi));
            }
        }
        Ok(old)
    }

    /// Removes a phi whose result is consumed by nothing but the phi itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueInUse`] if the result has other consumers.
    pub fn remove_phi(&mut self, phi: PhiId) -> Result<()> {
        let result = self.phi(phi)?.result;
        let value = self.value(result)?;
        if value.users().any(|(user, _)| user != User::Phi(phi)) {
            return Err(Error::ValueInUse(result, value.unique_users()));
        }

        let Some(data) = self.phis.get_mut(phi.index()).and_then(Option::take) else {
            return Err(Error::PhiNotFound(phi));
        };
        for source in data.sources.values() {
            if let Ok(value) = self.value_mut(*source) {
                value.take_uses(User::Phi(phi));
            }
        }
        self.force_destroy(data.result)?;
        if let Ok(block) = self.block_mut(data.block) {
            block.phis.retain(|&p| p != phi);
        }
        Ok(())
    }

    // ── Dominance ───────────────────────────────────────────────────────

    /// Returns the dominance information for the current block graph,
    /// computing it if the cache was invalidated.
    ///
    /// This is the only way to read dominance.
    ///
    /// # Errors
    ///
    /// Returns an invariant error if the dominator fixpoint exceeds the
    /// configured iteration limit.
    pub fn dominance(&mut self) -> Result<Arc<Dominance>> {
        if let Some(dominance) = &self.dominance {
            return Ok(Arc::clone(dominance));
        }
        let dominance = Arc::new(Dominance::compute(self, self.dominance_limit)?);
        self.dominance = Some(Arc::clone(&dominance));
        Ok(dominance)
    }

    /// Drops cached dominance. The next [`Function::dominance`] call recomputes it.
    pub fn invalidate_dominance(&mut self) {
        self.dominance = None;
    }

    /// Returns `true` if cached dominance is present.
    #[must_use]
    pub fn is_dominance_valid(&self) -> bool {
        self.dominance.is_some()
    }

    /// Sets the dominator fixpoint iteration limit.
    pub fn set_dominance_limit(&mut self, limit: usize) {
        if self.dominance_limit != limit {
            self.dominance_limit = limit;
            self.invalidate_dominance();
        }
    }
}

impl GraphBase for Function {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.block_ids()
    }
}

impl Successors for Function {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.terminator_opcode(node)
            .map(|op| op.targets())
            .unwrap_or_default()
            .into_iter()
    }
}

impl Predecessors for Function {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.block_ids()
            .filter(move |&block| self.successors(block).any(|succ| succ == node))
    }
}

impl RootedGraph for Function {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        if self.variadic {
            f.write_str(if self.arguments.is_empty() { "..." } else { ", ..." })?;
        }
        f.write_str(")")?;
        if !self.open_upvalues.is_empty() || !self.closed_upvalues.is_empty() {
            write!(
                f,
                " upvalues(open: {:?}, closed: {:?})",
                self.open_upvalues, self.closed_upvalues
            )?;
        }
        writeln!(f)?;

        for block_id in self.block_ids() {
            let marker = if block_id == self.entry { " (entry)" } else { "" };
            writeln!(f, "{block_id}:{marker}")?;
            let Ok(block) = self.block(block_id) else {
                continue;
            };
            for &phi_id in &block.phis {
                let Ok(phi) = self.phi(phi_id) else {
                    continue;
                };
                write!(f, "  {} = phi [", phi.result)?;
                for (i, (pred, value)) in phi.sources.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{pred}: {value}")?;
                }
                writeln!(f, "]")?;
            }
            for &inst_id in &block.instructions {
                let Ok(inst) = self.instruction(inst_id) else {
                    continue;
                };
                f.write_str("  ")?;
                if let Some(result) = inst.result {
                    write!(f, "{result} = ")?;
                }
                write!(f, "{}", inst.opcode)?;
                let has_targets = !inst.opcode.targets().is_empty();
                for (i, operand) in inst.operands.iter().enumerate() {
                    f.write_str(if i == 0 && !has_targets { " " } else { ", " })?;
                    write!(f, "{operand}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::BinaryOp,
        test::{build_diamond, build_ternary},
    };

    #[test]
    fn test_new_function_has_entry() {
        let func = Function::new("f");
        assert_eq!(func.entry(), NodeId::new(0));
        assert_eq!(func.block_count(), 1);
        assert!(func.block(func.entry()).unwrap().is_empty());
    }

    #[test]
    fn test_append_after_terminator_fails() {
        let mut func = Function::new("f");
        let entry = func.entry();
        func.ret(entry, &[]).unwrap();

        let err = func.ret(entry, &[]).unwrap_err();
        assert!(matches!(err, Error::TerminatorExists(b) if b == entry));

        let arg = func.add_argument();
        let err = func.unary(entry, crate::ir::UnaryOp::Neg, arg).unwrap_err();
        assert!(matches!(err, Error::TerminatorExists(_)));
    }

    #[test]
    fn test_insert_before_rejects_terminator() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let ret = func.ret(entry, &[]).unwrap();
        assert!(func.insert_before(ret, Opcode::Return, vec![]).is_err());

        let arg = func.add_argument();
        let inserted = func
            .insert_before(ret, Opcode::Unary(crate::ir::UnaryOp::Not), vec![arg])
            .unwrap();
        assert_eq!(func.block(entry).unwrap().instructions(), &[inserted, ret]);
    }

    #[test]
    fn test_get_ref_requires_reference() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let arg = func.add_argument();
        assert!(func.get_ref(entry, arg).is_err());
    }

    #[test]
    fn test_replace_all_uses_moves_multiset() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let a = func.add_argument();
        let b = func.add_argument();
        let sum = func.binary(entry, BinaryOp::Add, a, a).unwrap();
        func.ret(entry, &[sum, a]).unwrap();

        assert_eq!(func.value(a).unwrap().use_count(), 3);
        assert_eq!(func.value(a).unwrap().unique_users(), 2);

        let replaced = func.replace_all_uses(a, b).unwrap();
        assert_eq!(replaced, 3);
        assert!(func.value(a).unwrap().is_unused());
        assert_eq!(func.value(b).unwrap().use_count(), 3);
        func.verify().unwrap();
    }

    #[test]
    fn test_remove_instruction_in_use_fails() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let a = func.add_argument();
        let neg = func.unary(entry, crate::ir::UnaryOp::Neg, a).unwrap();
        let ret = func.ret(entry, &[neg]).unwrap();

        let ValueDef::Instruction(neg_inst) = func.value(neg).unwrap().def() else {
            panic!("expected instruction result");
        };
        let err = func.remove_instruction(neg_inst).unwrap_err();
        assert!(matches!(err, Error::ValueInUse(v, 1) if v == neg));

        func.remove_instruction(ret).unwrap();
        func.remove_instruction(neg_inst).unwrap();
        assert!(func.value(a).unwrap().is_unused());
        assert!(matches!(func.value(neg), Err(Error::ValueNotFound(_))));
    }

    #[test]
    fn test_set_operand_updates_uses() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let a = func.add_argument();
        let b = func.add_argument();
        let ret = func.ret(entry, &[a]).unwrap();

        func.set_operand(ret, 0, b).unwrap();
        assert!(func.value(a).unwrap().is_unused());
        assert_eq!(func.value(b).unwrap().uses_by(User::Inst(ret)), 1);
        assert!(func.set_operand(ret, 3, b).is_err());
    }

    #[test]
    fn test_edge_edits_invalidate_dominance() {
        let mut func = build_diamond().func;
        func.dominance().unwrap();
        assert!(func.is_dominance_valid());

        let extra = func.add_block();
        assert!(!func.is_dominance_valid());
        func.ret(extra, &[]).unwrap();

        func.dominance().unwrap();
        let entry = func.entry();
        let succ: Vec<NodeId> = func.successors(entry).collect();
        func.retarget(entry, succ[0], extra).unwrap();
        assert!(!func.is_dominance_valid());
    }

    #[test]
    fn test_non_terminator_edits_keep_dominance() {
        let mut func = build_diamond().func;
        let dom = func.dominance().unwrap();
        let arg = func.add_argument();
        let join = NodeId::new(3);
        let term = func.terminator(join).unwrap().unwrap();
        func.insert_before(term, Opcode::Unary(crate::ir::UnaryOp::Not), vec![arg])
            .unwrap();
        assert!(Arc::ptr_eq(&dom, &func.dominance().unwrap()));
    }

    #[test]
    fn test_predecessors_are_derived() {
        let fixture = build_diamond();
        let preds: Vec<NodeId> = fixture.func.predecessors(fixture.join).collect();
        assert_eq!(preds, vec![fixture.left, fixture.right]);
        assert_eq!(fixture.func.predecessors(fixture.func.entry()).count(), 0);
    }

    #[test]
    fn test_phi_sources_and_removal() {
        let fixture = build_diamond();
        let mut func = fixture.func;
        let a = func.add_argument();
        let b = func.add_argument();

        let phi = func.add_phi(fixture.join).unwrap();
        func.set_phi_source(phi, fixture.left, a).unwrap();
        func.set_phi_source(phi, fixture.right, b).unwrap();
        func.set_phi_source(phi, fixture.right, a).unwrap();

        assert_eq!(func.value(a).unwrap().uses_by(User::Phi(phi)), 2);
        assert!(func.value(b).unwrap().is_unused());

        assert_eq!(func.remove_phi_source(phi, fixture.left).unwrap(), Some(a));
        func.remove_phi(phi).unwrap();
        assert!(func.value(a).unwrap().is_unused());
        assert!(func.block(fixture.join).unwrap().phis().is_empty());
    }

    #[test]
    fn test_remove_phi_in_use_fails() {
        let fixture = build_diamond();
        let mut func = fixture.func;
        let phi = func.add_phi(fixture.join).unwrap();
        let result = func.phi(phi).unwrap().result();
        let term = func.terminator(fixture.join).unwrap().unwrap();
        func.insert_before(term, Opcode::Unary(crate::ir::UnaryOp::Neg), vec![result])
            .unwrap();
        assert!(matches!(func.remove_phi(phi), Err(Error::ValueInUse(..))));
    }

    #[test]
    fn test_remove_block_with_predecessor_fails() {
        let fixture = build_diamond();
        let mut func = fixture.func;
        assert!(func.remove_block(fixture.left).is_err());
        assert!(func.remove_block(func.entry()).is_err());
    }

    #[test]
    fn test_remove_block_drops_edge_sources() {
        let fixture = build_diamond();
        let mut func = fixture.func;
        let a = func.add_argument();
        let phi = func.add_phi(fixture.join).unwrap();
        func.set_phi_source(phi, fixture.left, a).unwrap();
        func.set_phi_source(phi, fixture.right, a).unwrap();

        // Make `right` unreachable by sending both arms of the entry to `left`.
        let entry = func.entry();
        func.retarget(entry, fixture.right, fixture.left).unwrap();
        func.remove_block(fixture.right).unwrap();

        assert!(!func.has_block(fixture.right));
        assert_eq!(func.phi(phi).unwrap().sources().len(), 1);
        assert_eq!(func.value(a).unwrap().use_count(), 1);
    }

    #[test]
    fn test_remove_unreachable_blocks() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let live = func.add_block();
        let dead = func.add_block();
        let dead2 = func.add_block();
        func.branch(entry, live).unwrap();

        // Dead code that references itself and feeds a live phi.
        let arg = func.add_argument();
        let neg = func.unary(dead, crate::ir::UnaryOp::Neg, arg).unwrap();
        func.branch(dead, dead2).unwrap();
        let twice = func.binary(dead2, BinaryOp::Add, neg, neg).unwrap();
        func.branch(dead2, live).unwrap();
        let phi = func.add_phi(live).unwrap();
        func.set_phi_source(phi, entry, arg).unwrap();
        func.set_phi_source(phi, dead2, twice).unwrap();
        let result = func.phi(phi).unwrap().result();
        func.ret(live, &[result]).unwrap();

        let removed = func.remove_unreachable_blocks().unwrap();
        assert_eq!(removed, vec![dead, dead2]);
        assert_eq!(func.phi(phi).unwrap().sources().len(), 1);
        assert_eq!(func.value(arg).unwrap().unique_users(), 1);
        assert!(func.value(twice).is_err());
        func.verify().unwrap();
    }

    #[test]
    fn test_force_destroy_ignores_users() {
        let mut pool = ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let seven = func.constant(&mut pool, 7i64);
        func.ret(entry, &[seven]).unwrap();

        func.force_destroy(seven).unwrap();
        assert!(matches!(func.value(seven), Err(Error::ValueNotFound(_))));
        assert!(matches!(func.force_destroy(seven), Err(Error::ValueNotFound(_))));

        // The cache entry went with it, so the constant is materialized anew.
        let again = func.constant(&mut pool, 7i64);
        assert_ne!(again, seven);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_constants_are_cached_per_function() {
        let mut pool = ConstantPool::new();
        let mut f = Function::new("f");
        let mut g = Function::new("g");

        let a = f.constant(&mut pool, 2i64);
        let b = f.constant(&mut pool, 2i64);
        let c = g.constant(&mut pool, 2i64);
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
        assert!(matches!(g.value(c).unwrap().def(), ValueDef::Constant(id) if id.index() == 0));
    }

    #[test]
    fn test_upvalues() {
        let mut func = Function::new("f");
        let open = func.add_upvalue(Capture::Open);
        let closed = func.add_upvalue(Capture::Closed);
        assert_eq!(func.value(open).unwrap().kind(), ValueKind::Reference);
        assert_eq!(func.value(closed).unwrap().kind(), ValueKind::Value);
        assert_eq!(func.open_upvalues(), &[open]);
        assert_eq!(func.closed_upvalues(), &[closed]);
    }

    #[test]
    fn test_display_listing() {
        let fixture = build_ternary();
        let listing = fixture.func.to_string();
        assert!(listing.starts_with("function ternary(v0)"));
        assert!(listing.contains("b0: (entry)"));
        assert!(listing.contains("new_ref"));
        assert!(listing.contains("cond_branch b1, b2, v0"));
    }
}
