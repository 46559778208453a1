//! IR verifier.
//!
//! Walks every block, phi, instruction and value of a function and collects
//! every broken invariant instead of stopping at the first one, so a single
//! run after a faulty pass reports everything that pass got wrong.
//!
//! # Checks
//!
//! - every block ends in exactly one terminator, and terminators are last
//! - instructions and phis are owned by the block that sequences them
//! - branch targets, operands and phi sources refer to live entities
//! - operand lists, phi source maps and use lists agree in both directions
//! - every use is dominated by its definition (same-block uses must follow
//!   the definition; phi sources must be available at the end of their edge)
//! - in reachable blocks, phi source maps have exactly one entry per
//!   predecessor

use std::collections::BTreeSet;

use crate::{
    analysis::Dominance,
    error::Violation,
    ir::{Function, InstId, PhiId, User, ValueDef, ValueId},
    utils::graph::{NodeId, Predecessors},
    Error, Result,
};

struct Collector<'a> {
    function: &'a str,
    violations: Vec<Violation>,
}

impl Collector<'_> {
    fn push(&mut self, block: Option<NodeId>, instruction: Option<InstId>, message: String) {
        self.violations.push(Violation {
            function: self.function.to_string(),
            block,
            instruction,
            message,
        });
    }
}

impl Function {
    /// Checks every IR invariant and reports all violations at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] listing every violation found.
    pub fn verify(&mut self) -> Result<()> {
        let dominance = match self.dominance() {
            Ok(dominance) => Some(dominance),
            Err(err) => {
                log::warn!("{}: dominance unavailable during verification: {err}", self.name());
                None
            }
        };
        let violations = self.violations(dominance.as_deref());
        if violations.is_empty() {
            Ok(())
        } else {
            log::debug!("{}: {} violation(s)\n{}", self.name(), violations.len(), self);
            Err(Error::Verification(violations))
        }
    }

    /// Collects violations without failing.
    ///
    /// Dominance checks are skipped when `dominance` is `None`.
    #[must_use]
    pub fn violations(&self, dominance: Option<&Dominance>) -> Vec<Violation> {
        let mut out = Collector {
            function: self.name(),
            violations: Vec::new(),
        };
        if dominance.is_none() {
            out.push(None, None, "dominance could not be computed".to_string());
        }

        if !self.has_block(self.entry()) {
            out.push(Some(self.entry()), None, "entry block does not exist".to_string());
        }

        for block in self.block_ids() {
            self.check_block(block, dominance, &mut out);
        }
        self.check_use_lists(&mut out);
        out.violations
    }

    fn check_block(&self, block: NodeId, dominance: Option<&Dominance>, out: &mut Collector<'_>) {
        let Ok(data) = self.block(block) else {
            return;
        };

        match data.last() {
            None => out.push(Some(block), None, "block is empty (missing terminator)".to_string()),
            Some(last) => match self.instruction(last) {
                Ok(inst) if !inst.is_terminator() => {
                    out.push(Some(block), Some(last), "missing terminator".to_string());
                }
                _ => {}
            },
        }

        for &phi in data.phis() {
            self.check_phi(block, phi, dominance, out);
        }

        for (position, &inst) in data.instructions().iter().enumerate() {
            let Ok(instruction) = self.instruction(inst) else {
                out.push(Some(block), Some(inst), "sequenced instruction does not exist".to_string());
                continue;
            };
            if instruction.block() != block {
                out.push(
                    Some(block),
                    Some(inst),
                    format!("instruction is owned by {}", instruction.block()),
                );
            }
            if instruction.is_terminator() && position + 1 != data.instructions().len() {
                out.push(Some(block), Some(inst), "terminator is not last".to_string());
            }
            for target in instruction.opcode().targets() {
                if !self.has_block(target) {
                    out.push(Some(block), Some(inst), format!("branch to missing block {target}"));
                }
            }
            if let Some(result) = instruction.result() {
                match self.value(result) {
                    Ok(value) if value.def() == ValueDef::Instruction(inst) => {}
                    Ok(value) => out.push(
                        Some(block),
                        Some(inst),
                        format!("result {result} is defined by {:?}", value.def()),
                    ),
                    Err(_) => out.push(Some(block), Some(inst), format!("result {result} does not exist")),
                }
            }

            for &operand in instruction.operands() {
                let Ok(value) = self.value(operand) else {
                    out.push(Some(block), Some(inst), format!("operand {operand} does not exist"));
                    continue;
                };
                let expected = instruction.operands().iter().filter(|&&o| o == operand).count();
                if value.uses_by(User::Inst(inst)) != expected {
                    out.push(
                        Some(block),
                        Some(inst),
                        format!(
                            "use list of {operand} records {} use(s), operands hold {expected}",
                            value.uses_by(User::Inst(inst))
                        ),
                    );
                }
                if let Some(dom) = dominance {
                    if dom.is_reachable(block) && !self.available_at(operand, block, Some(position), dom) {
                        out.push(
                            Some(block),
                            Some(inst),
                            format!("operand {operand} is not dominated by its definition"),
                        );
                    }
                }
            }
        }
    }

    fn check_phi(&self, block: NodeId, phi: PhiId, dominance: Option<&Dominance>, out: &mut Collector<'_>) {
        let Ok(data) = self.phi(phi) else {
            out.push(Some(block), None, format!("listed phi {phi} does not exist"));
            return;
        };
        if data.block() != block {
            out.push(Some(block), None, format!("phi {phi} is owned by {}", data.block()));
        }
        match self.value(data.result()) {
            Ok(value) if value.def() == ValueDef::Phi(phi) => {}
            _ => out.push(Some(block), None, format!("phi {phi} result {} is broken", data.result())),
        }

        for (&pred, &source) in data.sources() {
            let Ok(value) = self.value(source) else {
                out.push(Some(block), None, format!("phi {phi} source {source} does not exist"));
                continue;
            };
            let expected = data.sources().values().filter(|&&s| s == source).count();
            if value.uses_by(User::Phi(phi)) != expected {
                out.push(
                    Some(block),
                    None,
                    format!("use list of {source} is out of sync with phi {phi}"),
                );
            }
            if let Some(dom) = dominance {
                if dom.is_reachable(pred) && !self.available_at(source, pred, None, dom) {
                    out.push(
                        Some(block),
                        None,
                        format!("phi {phi} source {source} from {pred} is not dominated by its definition"),
                    );
                }
            }
        }

        if let Some(dom) = dominance {
            if dom.is_reachable(block) {
                let preds: BTreeSet<NodeId> = self
                    .predecessors(block)
                    .filter(|&p| dom.is_reachable(p))
                    .collect();
                let keys: BTreeSet<NodeId> = data.sources().keys().copied().collect();
                for missing in preds.difference(&keys) {
                    out.push(Some(block), None, format!("phi {phi} has no source for predecessor {missing}"));
                }
                for extra in keys.difference(&preds) {
                    out.push(Some(block), None, format!("phi {phi} has a source for non-predecessor {extra}"));
                }
            }
        }
    }

    /// Returns `true` if `value` is available in `block` before instruction
    /// index `position`, or at the end of `block` when `position` is `None`.
    fn available_at(&self, value: ValueId, block: NodeId, position: Option<usize>, dom: &Dominance) -> bool {
        let Ok(data) = self.value(value) else {
            return false;
        };
        match data.def() {
            ValueDef::Argument(_) | ValueDef::Constant(_) | ValueDef::Upvalue(..) => true,
            ValueDef::Phi(phi) => self
                .phi(phi)
                .is_ok_and(|p| dom.dominates(p.block(), block)),
            ValueDef::Instruction(inst) => {
                let Ok(def) = self.instruction(inst) else {
                    return false;
                };
                if def.block() != block {
                    return dom.strictly_dominates(def.block(), block);
                }
                match position {
                    None => true,
                    Some(position) => self
                        .block(block)
                        .ok()
                        .and_then(|b| b.position(inst))
                        .is_some_and(|def_position| def_position < position),
                }
            }
        }
    }

    /// Checks that every recorded use points at a consumer that really uses the value.
    fn check_use_lists(&self, out: &mut Collector<'_>) {
        for id in self.value_ids() {
            let Ok(value) = self.value(id) else {
                continue;
            };
            match value.def() {
                ValueDef::Instruction(inst)
                    if self.instruction(inst).ok().and_then(|i| i.result()) != Some(id) =>
                {
                    out.push(None, Some(inst), format!("value {id} claims a dead defining instruction"));
                }
                ValueDef::Phi(phi) if self.phi(phi).map(|p| p.result()).ok() != Some(id) => {
                    out.push(None, None, format!("value {id} claims dead phi {phi}"));
                }
                _ => {}
            }

            for (user, count) in value.users() {
                let actual = match user {
                    User::Inst(inst) => self
                        .instruction(inst)
                        .map(|i| i.operands().iter().filter(|&&o| o == id).count()),
                    User::Phi(phi) => self
                        .phi(phi)
                        .map(|p| p.sources().values().filter(|&&s| s == id).count()),
                };
                match actual {
                    Ok(actual) if actual == count => {}
                    Ok(actual) => out.push(
                        self.user_block(user).ok(),
                        None,
                        format!("{id} records {count} use(s) by {user}, which holds {actual}"),
                    ),
                    Err(_) => out.push(None, None, format!("{id} is used by dead {user}")),
                }
            }
        }
    }
}
