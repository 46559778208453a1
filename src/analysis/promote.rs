//! Promotion of reference cells to SSA values.
//!
//! Front ends model every mutable local as a Reference-kind cell:
//!
//! ```text
//! v1 = new_ref v0        ; creation, v0 is the initial value
//! set_ref v1, v2         ; store
//! v3 = get_ref v1        ; load
//! v4 = closure 7, v1     ; capture
//! ```
//!
//! [`SsaPromoter`] replaces such a cell by the values stored into it, adding
//! phis where different stores reach one load along different paths.
//!
//! # Algorithm
//!
//! 1. **Classification**: every consumer of the cell must be a load, a store
//!    into it, or a closure capture. Anything else (the cell passed to a call,
//!    stored into another cell, merged by a phi) makes the cell escape and it is
//!    left alone.
//! 2. **Shortcuts**: cells without uses, without stores, without loads, or
//!    whose uses all live in the creation block are rewritten directly.
//! 3. **Phi placement**: phis go on the iterated dominance frontier of the
//!    blocks that store into the cell, restricted to blocks strictly dominated
//!    by the creation block.
//! 4. **Renaming**: a dominator-tree preorder walk from the creation block
//!    carries the value current on each path, rewriting loads, dropping stores
//!    and filling phi sources on every edge into a phi block.
//! 5. **Pruning**: phis that only feed other dead phis are removed again.
//!
//! # Captures
//!
//! A capture turns into a closed capture of the value current at the closure.
//! That is only sound when nothing after the capture can observe a write the
//! closure might make, so a cell is promoted only if no other use of it is
//! reachable from any capture point.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    analysis::Dominance,
    ir::{Function, InstId, Opcode, PhiId, User, ValueDef, ValueId},
    utils::{
        graph::{GraphBase, NodeId},
        BitSet,
    },
    Result,
};

/// How one consumer uses a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellUse {
    /// `get_ref` of the cell.
    Get(InstId),
    /// `set_ref` into the cell.
    Set(InstId),
    /// The cell is captured by a closure.
    Capture(InstId),
}

impl CellUse {
    /// Returns the consuming instruction.
    #[must_use]
    pub fn instruction(&self) -> InstId {
        match self {
            CellUse::Get(inst) | CellUse::Set(inst) | CellUse::Capture(inst) => *inst,
        }
    }
}

/// Why a cell was left in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    /// The instruction does not create a cell.
    NotACell,
    /// The cell is consumed by something other than a load, store or capture.
    Escapes,
    /// The cell is captured and captured-cell promotion is disabled.
    Captured,
    /// A use of the cell is reachable from a capture point.
    UsedAfterCapture,
    /// The cell or one of its uses sits in an unreachable block.
    Unreachable,
}

/// Which rewrite a promoted cell took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// The cell had no uses and was deleted.
    Unused,
    /// Only loads: each load became the initial value.
    ReadOnly,
    /// Only stores: the stores were dead and deleted.
    WriteOnly,
    /// All uses in the creation block: one forward substitution pass.
    Local,
    /// Phi placement and renaming over the dominator tree.
    Global {
        /// Phis that survived pruning.
        phis: usize,
    },
}

/// Result of trying to promote one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The cell was replaced by SSA values.
    Promoted(Promotion),
    /// The cell was left untouched.
    Skipped(Rejection),
}

/// Totals of a [`SsaPromoter::promote_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromotionStats {
    /// Cells replaced by SSA values.
    pub promoted: usize,
    /// Cells left in memory.
    pub skipped: usize,
    /// Phis inserted and kept.
    pub phis_inserted: usize,
    /// Cell creations, loads and stores deleted.
    pub instructions_removed: usize,
}

impl PromotionStats {
    /// Returns `true` if the run changed the function.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.promoted > 0
    }
}

/// The classified uses of one cell.
struct CellInfo {
    cell: ValueId,
    initial: ValueId,
    home: NodeId,
    uses: Vec<CellUse>,
}

/// Converts reference cells into SSA values.
#[derive(Debug, Clone, Copy)]
pub struct SsaPromoter {
    promote_captured: bool,
}

impl Default for SsaPromoter {
    fn default() -> Self {
        Self::new()
    }
}

impl SsaPromoter {
    /// Creates a promoter that also promotes captured cells.
    #[must_use]
    pub fn new() -> Self {
        Self {
            promote_captured: true,
        }
    }

    /// Enables or disables promotion of cells captured by closures.
    #[must_use]
    pub fn with_captured(mut self, enabled: bool) -> Self {
        self.promote_captured = enabled;
        self
    }

    /// Promotes every promotable cell reachable in `func`.
    ///
    /// Cells are visited in dominator-tree order of their creation blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if dominance cannot be computed or the function is
    /// structurally inconsistent.
    pub fn promote_all(&self, func: &mut Function) -> Result<PromotionStats> {
        let cells = Self::cells(func)?;
        let mut stats = PromotionStats::default();
        for cell in cells {
            let before = func.instruction_ids().count();
            match self.promote_cell(func, cell)? {
                Outcome::Promoted(promotion) => {
                    stats.promoted += 1;
                    if let Promotion::Global { phis } = promotion {
                        stats.phis_inserted += phis;
                    }
                    stats.instructions_removed +=
                        before.saturating_sub(func.instruction_ids().count());
                }
                Outcome::Skipped(reason) => {
                    log::trace!("{}: {} stays in memory ({})", func.name(), cell, reason);
                    stats.skipped += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Returns the cell creations of reachable blocks in dominator-tree
    /// preorder, the order [`promote_all`](Self::promote_all) visits them.
    ///
    /// # Errors
    ///
    /// Returns an error if dominance cannot be computed.
    pub fn cells(func: &mut Function) -> Result<Vec<InstId>> {
        let dom = func.dominance()?;
        let mut cells = Vec::new();
        for block in dom.dominator_preorder() {
            for &inst in func.block(block)?.instructions() {
                if matches!(func.instruction(inst)?.opcode(), Opcode::NewRef) {
                    cells.push(inst);
                }
            }
        }
        Ok(cells)
    }

    /// Promotes the cell created by `inst`.
    ///
    /// # Errors
    ///
    /// Returns an error if `inst` is a stale handle, dominance cannot be
    /// computed, or an edit fails on an inconsistent function.
    pub fn promote_cell(&self, func: &mut Function, inst: InstId) -> Result<Outcome> {
        let dom = func.dominance()?;
        let info = match self.classify(func, &dom, inst)? {
            Ok(info) => info,
            Err(rejection) => return Ok(Outcome::Skipped(rejection)),
        };

        let gets = info
            .uses
            .iter()
            .filter(|u| matches!(u, CellUse::Get(_)))
            .count();
        let sets = info
            .uses
            .iter()
            .filter(|u| matches!(u, CellUse::Set(_)))
            .count();
        let captures = info.uses.len() - gets - sets;

        let promotion = if info.uses.is_empty() {
            Promotion::Unused
        } else if sets == 0 {
            for cell_use in &info.uses {
                let mut current = info.initial;
                rewrite_use(func, cell_use.instruction(), info.cell, &mut current)?;
            }
            Promotion::ReadOnly
        } else if gets == 0 && captures == 0 {
            for cell_use in &info.uses {
                func.remove_instruction(cell_use.instruction())?;
            }
            Promotion::WriteOnly
        } else if info
            .uses
            .iter()
            .map(|u| func.instruction(u.instruction()).map(|i| i.block()))
            .collect::<Result<Vec<_>>>()?
            .iter()
            .all(|&block| block == info.home)
        {
            let mut current = info.initial;
            for inst in instructions_after(func, info.home, Some(inst))? {
                rewrite_use(func, inst, info.cell, &mut current)?;
            }
            Promotion::Local
        } else {
            let phis = self.rename(func, &dom, inst, &info)?;
            Promotion::Global { phis }
        };

        func.remove_instruction(inst)?;
        log::debug!(
            "{}: promoted {} ({:?}, {} use(s))",
            func.name(),
            info.cell,
            promotion,
            info.uses.len()
        );
        Ok(Outcome::Promoted(promotion))
    }

    /// Collects and checks the uses of the cell created by `inst`.
    fn classify(
        &self,
        func: &Function,
        dom: &Dominance,
        inst: InstId,
    ) -> Result<std::result::Result<CellInfo, Rejection>> {
        let data = func.instruction(inst)?;
        let (Opcode::NewRef, Some(cell), Some(&initial)) =
            (data.opcode(), data.result(), data.operands().first())
        else {
            return Ok(Err(Rejection::NotACell));
        };
        let home = data.block();
        if !dom.is_reachable(home) {
            return Ok(Err(Rejection::Unreachable));
        }

        let mut uses = Vec::new();
        for (user, _) in func.value(cell)?.users() {
            let User::Inst(user) = user else {
                return Ok(Err(Rejection::Escapes));
            };
            let consumer = func.instruction(user)?;
            let operands = consumer.operands();
            let cell_use = match consumer.opcode() {
                Opcode::GetRef if operands.first() == Some(&cell) => CellUse::Get(user),
                Opcode::SetRef if operands.first() == Some(&cell) && operands.get(1) != Some(&cell) => {
                    CellUse::Set(user)
                }
                Opcode::Closure(_) => CellUse::Capture(user),
                _ => return Ok(Err(Rejection::Escapes)),
            };
            if !dom.is_reachable(consumer.block()) {
                return Ok(Err(Rejection::Unreachable));
            }
            uses.push(cell_use);
        }

        let captured = uses.iter().any(|u| matches!(u, CellUse::Capture(_)));
        if captured {
            if !self.promote_captured {
                return Ok(Err(Rejection::Captured));
            }
            if !captures_are_final(func, dom, &uses)? {
                return Ok(Err(Rejection::UsedAfterCapture));
            }
        }

        Ok(Ok(CellInfo {
            cell,
            initial,
            home,
            uses,
        }))
    }

    /// General case: places phis, renames along the dominator tree and prunes.
    ///
    /// Returns the number of phis kept.
    fn rename(
        &self,
        func: &mut Function,
        dom: &Dominance,
        creation: InstId,
        info: &CellInfo,
    ) -> Result<usize> {
        let mut store_blocks = BTreeSet::new();
        for cell_use in &info.uses {
            if let CellUse::Set(inst) = cell_use {
                store_blocks.insert(func.instruction(*inst)?.block());
            }
        }

        let home = info.home;
        let placement = dom.iterated_frontier(store_blocks, |b| dom.strictly_dominates(home, b));
        let mut phi_at: BTreeMap<NodeId, PhiId> = BTreeMap::new();
        for block in placement {
            phi_at.insert(block, func.add_phi(block)?);
        }

        let mut stack = vec![(home, info.initial)];
        while let Some((block, incoming)) = stack.pop() {
            let mut current = match phi_at.get(&block) {
                Some(&phi) => func.phi(phi)?.result(),
                None => incoming,
            };

            let start = (block == home).then_some(creation);
            for inst in instructions_after(func, block, start)? {
                rewrite_use(func, inst, info.cell, &mut current)?;
            }

            let mut seen = BTreeSet::new();
            for &succ in dom.graph().successor_list(block) {
                if !seen.insert(succ) {
                    continue;
                }
                if let Some(&phi) = phi_at.get(&succ) {
                    func.set_phi_source(phi, block, current)?;
                }
            }

            for &child in dom.children(block).iter().rev() {
                stack.push((child, current));
            }
        }

        let inserted: Vec<PhiId> = phi_at.into_values().collect();
        let removed = prune_dead_phis(func, &inserted)?;
        Ok(inserted.len() - removed)
    }
}

/// Returns the instructions of `block`, or only those after `after`.
fn instructions_after(func: &Function, block: NodeId, after: Option<InstId>) -> Result<Vec<InstId>> {
    let instructions = func.block(block)?.instructions();
    let start = match after {
        Some(inst) => func
            .block(block)?
            .position(inst)
            .map_or(instructions.len(), |p| p + 1),
        None => 0,
    };
    Ok(instructions[start..].to_vec())
}

/// Rewrites `inst` if it uses `cell`, tracking the value the cell holds.
///
/// Loads become `current`, stores update `current` and disappear, captures
/// close over `current`. Returns `true` if `inst` was removed.
fn rewrite_use(func: &mut Function, inst: InstId, cell: ValueId, current: &mut ValueId) -> Result<bool> {
    let data = func.instruction(inst)?;
    if !data.operands().contains(&cell) {
        return Ok(false);
    }

    match data.opcode() {
        Opcode::GetRef => {
            if let Some(result) = data.result() {
                func.replace_all_uses(result, *current)?;
            }
            func.remove_instruction(inst)?;
            Ok(true)
        }
        Opcode::SetRef => {
            *current = *data
                .operands()
                .get(1)
                .ok_or_else(|| invariant_error!("{} stores nothing", inst))?;
            func.remove_instruction(inst)?;
            Ok(true)
        }
        Opcode::Closure(_) => {
            let slots: Vec<usize> = data
                .operands()
                .iter()
                .enumerate()
                .filter(|(_, &op)| op == cell)
                .map(|(i, _)| i)
                .collect();
            for index in slots {
                func.set_operand(inst, index, *current)?;
            }
            Ok(false)
        }
        other => Err(invariant_error!(
            "{} ({}) uses cell {} but is not a cell access",
            inst,
            other,
            cell
        )),
    }
}

/// Checks that no use of the cell is reachable from any capture.
fn captures_are_final(func: &Function, dom: &Dominance, uses: &[CellUse]) -> Result<bool> {
    let graph = dom.graph();
    let mut located = Vec::with_capacity(uses.len());
    for cell_use in uses {
        let inst = cell_use.instruction();
        let block = func.instruction(inst)?.block();
        let position = func.block(block)?.position(inst).unwrap_or(0);
        located.push((inst, block, position));
    }

    for cell_use in uses {
        let CellUse::Capture(capture) = cell_use else {
            continue;
        };
        let Some(&(_, block, position)) = located.iter().find(|(i, _, _)| i == capture) else {
            continue;
        };

        let mut reached = BitSet::new(graph.node_count());
        let mut queue: VecDeque<NodeId> = graph.successor_list(block).iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if reached.insert(next.index()) {
                queue.extend(graph.successor_list(next).iter().copied());
            }
        }

        for &(inst, other_block, other_position) in &located {
            if inst == *capture {
                continue;
            }
            let later = if other_block == block {
                other_position > position || reached.contains(block.index())
            } else {
                reached.contains(other_block.index())
            };
            if later {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Removes the phis in `inserted` that nothing outside dead phis consumes.
///
/// Returns the number removed.
fn prune_dead_phis(func: &mut Function, inserted: &[PhiId]) -> Result<usize> {
    let ours: BTreeSet<PhiId> = inserted.iter().copied().collect();
    let mut live = BTreeSet::new();
    let mut worklist = Vec::new();

    for &phi in inserted {
        let result = func.phi(phi)?.result();
        let observed = func.value(result)?.users().any(|(user, _)| match user {
            User::Inst(_) => true,
            User::Phi(other) => !ours.contains(&other),
        });
        if observed && live.insert(phi) {
            worklist.push(phi);
        }
    }

    while let Some(phi) = worklist.pop() {
        let sources: Vec<ValueId> = func.phi(phi)?.sources().values().copied().collect();
        for source in sources {
            if let ValueDef::Phi(feeding) = func.value(source)?.def() {
                if ours.contains(&feeding) && live.insert(feeding) {
                    worklist.push(feeding);
                }
            }
        }
    }

    let dead: Vec<PhiId> = inserted.iter().copied().filter(|p| !live.contains(p)).collect();
    for &phi in &dead {
        let preds: Vec<NodeId> = func.phi(phi)?.sources().keys().copied().collect();
        for pred in preds {
            func.remove_phi_source(phi, pred)?;
        }
    }
    for &phi in &dead {
        func.remove_phi(phi)?;
    }
    Ok(dead.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::Literal,
        test::{build_counter, build_ternary},
    };

    fn cell_accesses(func: &Function) -> usize {
        func.instruction_ids()
            .filter(|&i| {
                matches!(
                    func.instruction(i).unwrap().opcode(),
                    Opcode::NewRef | Opcode::GetRef | Opcode::SetRef
                )
            })
            .count()
    }

    #[test]
    fn test_ternary_gets_one_phi() {
        let fixture = build_ternary();
        let mut func = fixture.func;

        let outcome = SsaPromoter::new()
            .promote_cell(&mut func, fixture.cell_inst)
            .unwrap();
        assert_eq!(outcome, Outcome::Promoted(Promotion::Global { phis: 1 }));
        assert_eq!(cell_accesses(&func), 0);

        let phis: Vec<PhiId> = func.phi_ids().collect();
        assert_eq!(phis.len(), 1);
        let phi = func.phi(phis[0]).unwrap();
        assert_eq!(phi.block(), fixture.join);
        assert_eq!(
            phi.sources(),
            &BTreeMap::from([(fixture.left, fixture.two), (fixture.right, fixture.three)])
        );
        func.verify().unwrap();
    }

    #[test]
    fn test_loop_counter_phi_at_header() {
        let fixture = build_counter();
        let mut func = fixture.func;

        let stats = SsaPromoter::new().promote_all(&mut func).unwrap();
        assert_eq!(stats.promoted, 1);
        assert_eq!(stats.phis_inserted, 1);
        assert_eq!(stats.instructions_removed, 5);
        assert_eq!(cell_accesses(&func), 0);

        let phi_id = func.phi_ids().next().unwrap();
        let phi = func.phi(phi_id).unwrap();
        assert_eq!(phi.block(), fixture.header);
        assert_eq!(
            phi.sources(),
            &BTreeMap::from([
                (func.entry(), fixture.zero),
                (fixture.body, fixture.incremented)
            ])
        );
        func.verify().unwrap();
    }

    #[test]
    fn test_unused_cell_is_deleted() {
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let nil = func.constant(&mut pool, Literal::Nil);
        func.new_ref(entry, nil).unwrap();
        func.ret(entry, &[]).unwrap();
        let cell = func.block(entry).unwrap().instructions()[0];

        let outcome = SsaPromoter::new().promote_cell(&mut func, cell).unwrap();
        assert_eq!(outcome, Outcome::Promoted(Promotion::Unused));
        assert_eq!(func.block(entry).unwrap().instructions().len(), 1);
    }

    #[test]
    fn test_read_only_cell_uses_initial_value() {
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let next = func.add_block();
        let seven = func.constant(&mut pool, 7i64);
        let cell = func.new_ref(entry, seven).unwrap();
        func.branch(entry, next).unwrap();
        let x = func.get_ref(next, cell).unwrap();
        let ret = func.ret(next, &[x]).unwrap();
        let creation = func.block(entry).unwrap().instructions()[0];

        let outcome = SsaPromoter::new().promote_cell(&mut func, creation).unwrap();
        assert_eq!(outcome, Outcome::Promoted(Promotion::ReadOnly));
        assert_eq!(func.instruction(ret).unwrap().operands(), &[seven]);
        func.verify().unwrap();
    }

    #[test]
    fn test_write_only_cell_is_dead_store() {
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let next = func.add_block();
        let nil = func.constant(&mut pool, Literal::Nil);
        let one = func.constant(&mut pool, 1i64);
        let cell = func.new_ref(entry, nil).unwrap();
        func.branch(entry, next).unwrap();
        func.set_ref(next, cell, one).unwrap();
        func.ret(next, &[]).unwrap();
        let creation = func.block(entry).unwrap().instructions()[0];

        let outcome = SsaPromoter::new().promote_cell(&mut func, creation).unwrap();
        assert_eq!(outcome, Outcome::Promoted(Promotion::WriteOnly));
        assert_eq!(cell_accesses(&func), 0);
    }

    #[test]
    fn test_single_block_forward_substitution() {
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let one = func.constant(&mut pool, 1i64);
        let two = func.constant(&mut pool, 2i64);
        let cell = func.new_ref(entry, one).unwrap();
        let a = func.get_ref(entry, cell).unwrap();
        func.set_ref(entry, cell, two).unwrap();
        let b = func.get_ref(entry, cell).unwrap();
        let ret = func.ret(entry, &[a, b]).unwrap();
        let creation = func.block(entry).unwrap().instructions()[0];

        let outcome = SsaPromoter::new().promote_cell(&mut func, creation).unwrap();
        assert_eq!(outcome, Outcome::Promoted(Promotion::Local));
        assert_eq!(func.instruction(ret).unwrap().operands(), &[one, two]);
        assert!(func.phi_ids().next().is_none());
    }

    #[test]
    fn test_escaping_cell_is_skipped() {
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let callee = func.add_argument();
        let nil = func.constant(&mut pool, Literal::Nil);
        let cell = func.new_ref(entry, nil).unwrap();
        func.call(entry, callee, &[cell]).unwrap();
        func.ret(entry, &[]).unwrap();
        let creation = func.block(entry).unwrap().instructions()[0];

        let outcome = SsaPromoter::new().promote_cell(&mut func, creation).unwrap();
        assert_eq!(outcome, Outcome::Skipped(Rejection::Escapes));
        assert_eq!(cell_accesses(&func), 1);
    }

    #[test]
    fn test_capture_becomes_closed_over_current_value() {
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let next = func.add_block();
        let one = func.constant(&mut pool, 1i64);
        let two = func.constant(&mut pool, 2i64);
        let cell = func.new_ref(entry, one).unwrap();
        func.branch(entry, next).unwrap();
        func.set_ref(next, cell, two).unwrap();
        let closure = func.closure(next, 0, &[cell]).unwrap();
        func.ret(next, &[closure]).unwrap();
        let creation = func.block(entry).unwrap().instructions()[0];

        let outcome = SsaPromoter::new().promote_cell(&mut func, creation).unwrap();
        assert!(matches!(outcome, Outcome::Promoted(_)));
        let ValueDef::Instruction(closure_inst) = func.value(closure).unwrap().def() else {
            panic!("closure result is not an instruction");
        };
        assert_eq!(func.instruction(closure_inst).unwrap().operands(), &[two]);
        func.verify().unwrap();
    }

    #[test]
    fn test_use_after_capture_is_skipped() {
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let one = func.constant(&mut pool, 1i64);
        let cell = func.new_ref(entry, one).unwrap();
        let closure = func.closure(entry, 0, &[cell]).unwrap();
        let x = func.get_ref(entry, cell).unwrap();
        func.ret(entry, &[closure, x]).unwrap();
        let creation = func.block(entry).unwrap().instructions()[0];

        let promoter = SsaPromoter::new();
        assert_eq!(
            promoter.promote_cell(&mut func, creation).unwrap(),
            Outcome::Skipped(Rejection::UsedAfterCapture)
        );
        assert_eq!(
            promoter
                .with_captured(false)
                .promote_cell(&mut func, creation)
                .unwrap(),
            Outcome::Skipped(Rejection::Captured)
        );
    }

    #[test]
    fn test_dead_phis_are_pruned() {
        // Both arms store, only the left arm reads first; nothing reads after the join.
        let mut pool = crate::ir::ConstantPool::new();
        let mut func = Function::new("f");
        let entry = func.entry();
        let left = func.add_block();
        let right = func.add_block();
        let join = func.add_block();
        let cond = func.add_argument();
        let nil = func.constant(&mut pool, Literal::Nil);
        let two = func.constant(&mut pool, 2i64);
        let three = func.constant(&mut pool, 3i64);

        let cell = func.new_ref(entry, nil).unwrap();
        func.cond_branch(entry, cond, left, right).unwrap();
        let old = func.get_ref(left, cell).unwrap();
        func.set_ref(left, cell, two).unwrap();
        func.branch(left, join).unwrap();
        func.set_ref(right, cell, three).unwrap();
        func.branch(right, join).unwrap();
        func.ret(join, &[]).unwrap();
        let creation = func.block(entry).unwrap().instructions()[0];
        let left_branch = func.terminator(left).unwrap().unwrap();

        let outcome = SsaPromoter::new().promote_cell(&mut func, creation).unwrap();
        assert_eq!(outcome, Outcome::Promoted(Promotion::Global { phis: 0 }));
        assert!(func.phi_ids().next().is_none());
        assert!(func.value(old).is_err());
        assert!(func.instruction(left_branch).is_ok());
        func.verify().unwrap();
    }

    #[test]
    fn test_promote_all_is_idempotent() {
        let mut func = build_counter().func;
        let promoter = SsaPromoter::new();
        assert!(promoter.promote_all(&mut func).unwrap().changed());
        let again = promoter.promote_all(&mut func).unwrap();
        assert_eq!(again, PromotionStats::default());
    }
}
