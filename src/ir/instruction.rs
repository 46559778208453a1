//! Instructions and opcodes.
//!
//! An [`Instruction`] is an opcode plus an ordered operand list and, for
//! value-producing opcodes, a result value. Instructions live in the owning
//! function's arena and are sequenced by their block.
//!
//! # Operand conventions
//!
//! | Opcode        | Operands                       | Result    |
//! |---------------|--------------------------------|-----------|
//! | `Branch`      | -                              | -         |
//! | `CondBranch`  | `[condition]`                  | -         |
//! | `Return`      | returned values                | -         |
//! | `NewRef`      | `[initial]`                    | Reference |
//! | `GetRef`      | `[cell]`                       | Value     |
//! | `SetRef`      | `[cell, value]`                | -         |
//! | `Closure`     | captures                       | Value     |
//! | `Binary`      | `[lhs, rhs]`                   | Value     |
//! | `Unary`       | `[operand]`                    | Value     |
//! | `Call`        | `[callee, args...]`            | Tuple     |
//! | `Vararg`      | -                              | Tuple     |
//! | `Select`      | `[tuple]`                      | Value     |
//! | `MakeTuple`   | elements                       | Tuple     |
//!
//! A `Closure` capture operand of kind Reference is an open (by-address)
//! capture; any other capture operand is closed (by-copy).

use std::fmt;

use crate::{
    ir::{ValueId, ValueKind},
    utils::graph::NodeId,
};

/// A strongly-typed instruction identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstId(pub(crate) usize);

impl InstId {
    /// Creates an instruction identifier from an arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        InstId(index)
    }

    /// Returns the underlying arena index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstId({})", self.0)
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Binary arithmetic, comparison and string operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `..`
    Concat,
    /// `==`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not.
    Not,
    /// Length.
    Len,
}

/// Required operand count of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many operands.
    Exact(usize),
    /// At least this many operands.
    AtLeast(usize),
}

impl Arity {
    /// Returns `true` if `count` operands satisfy this arity.
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

/// Instruction opcode.
///
/// Branch targets are part of the opcode so that successor edges can be
/// read off a terminator without touching the operand list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Opcode {
    /// Unconditional branch.
    Branch(NodeId),
    /// Two-way branch on operand 0.
    CondBranch {
        /// Taken when the condition is truthy.
        if_true: NodeId,
        /// Taken otherwise.
        if_false: NodeId,
    },
    /// Function return with any number of values.
    Return,
    /// Allocate a mutable cell holding operand 0.
    NewRef,
    /// Read the cell in operand 0.
    GetRef,
    /// Store operand 1 into the cell in operand 0.
    SetRef,
    /// Instantiate a nested function prototype with the given captures.
    Closure(u32),
    /// Binary operator.
    Binary(BinaryOp),
    /// Unary operator.
    Unary(UnaryOp),
    /// Call operand 0 with the remaining operands.
    Call,
    /// The function's variadic arguments.
    Vararg,
    /// Extract the n-th element of a tuple.
    Select(u32),
    /// Build a tuple from the operands.
    MakeTuple,
}

impl Opcode {
    /// Returns the mnemonic used in listings.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.into()
    }

    /// Returns `true` for block terminators.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Branch(_) | Opcode::CondBranch { .. } | Opcode::Return
        )
    }

    /// Returns the kind of the value this opcode produces, if any.
    #[must_use]
    pub const fn result_kind(&self) -> Option<ValueKind> {
        match self {
            Opcode::NewRef => Some(ValueKind::Reference),
            Opcode::GetRef
            | Opcode::Closure(_)
            | Opcode::Binary(_)
            | Opcode::Unary(_)
            | Opcode::Select(_) => Some(ValueKind::Value),
            Opcode::Call | Opcode::Vararg | Opcode::MakeTuple => Some(ValueKind::Tuple),
            Opcode::Branch(_) | Opcode::CondBranch { .. } | Opcode::Return | Opcode::SetRef => {
                None
            }
        }
    }

    /// Returns the operand count this opcode requires.
    #[must_use]
    pub const fn arity(&self) -> Arity {
        match self {
            Opcode::Branch(_) | Opcode::Vararg => Arity::Exact(0),
            Opcode::CondBranch { .. }
            | Opcode::NewRef
            | Opcode::GetRef
            | Opcode::Unary(_)
            | Opcode::Select(_) => Arity::Exact(1),
            Opcode::SetRef | Opcode::Binary(_) => Arity::Exact(2),
            Opcode::Call => Arity::AtLeast(1),
            Opcode::Return | Opcode::Closure(_) | Opcode::MakeTuple => Arity::AtLeast(0),
        }
    }

    /// Returns the successor blocks named by a terminator, in edge order.
    ///
    /// Non-terminators have no successors. A conditional branch with both arms
    /// on the same block yields that block twice.
    #[must_use]
    pub fn targets(&self) -> Vec<NodeId> {
        match *self {
            Opcode::Branch(target) => vec![target],
            Opcode::CondBranch { if_true, if_false } => vec![if_true, if_false],
            _ => Vec::new(),
        }
    }

    /// Rewrites every target equal to `from` into `to`, returning how many
    /// edges changed.
    pub(crate) fn retarget(&mut self, from: NodeId, to: NodeId) -> usize {
        let mut changed = 0;
        match self {
            Opcode::Branch(target) => {
                if *target == from {
                    *target = to;
                    changed += 1;
                }
            }
            Opcode::CondBranch { if_true, if_false } => {
                for target in [if_true, if_false] {
                    if *target == from {
                        *target = to;
                        changed += 1;
                    }
                }
            }
            _ => {}
        }
        changed
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Branch(target) => write!(f, "branch {target}"),
            Opcode::CondBranch { if_true, if_false } => {
                write!(f, "cond_branch {if_true}, {if_false}")
            }
            Opcode::Closure(proto) => write!(f, "closure #{proto}"),
            Opcode::Binary(op) => write!(f, "{op}"),
            Opcode::Unary(op) => write!(f, "{op}"),
            Opcode::Select(index) => write!(f, "select {index}"),
            other => f.write_str(other.mnemonic()),
        }
    }
}

/// An instruction in a function's arena.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub(crate) opcode: Opcode,
    pub(crate) operands: Vec<ValueId>,
    pub(crate) result: Option<ValueId>,
    pub(crate) block: NodeId,
}

impl Instruction {
    /// Returns the opcode.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the operand list.
    #[must_use]
    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    /// Returns the produced value, if the opcode produces one.
    #[must_use]
    pub fn result(&self) -> Option<ValueId> {
        self.result
    }

    /// Returns the block that owns this instruction.
    #[must_use]
    pub fn block(&self) -> NodeId {
        self.block
    }

    /// Returns `true` if this instruction terminates its block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminators() {
        let b = NodeId::new(1);
        assert!(Opcode::Branch(b).is_terminator());
        assert!(Opcode::Return.is_terminator());
        assert!(!Opcode::SetRef.is_terminator());
        assert_eq!(Opcode::Branch(b).result_kind(), None);
    }

    #[test]
    fn test_result_kinds() {
        assert_eq!(Opcode::NewRef.result_kind(), Some(ValueKind::Reference));
        assert_eq!(Opcode::Call.result_kind(), Some(ValueKind::Tuple));
        assert_eq!(Opcode::Select(0).result_kind(), Some(ValueKind::Value));
        assert_eq!(Opcode::SetRef.result_kind(), None);
    }

    #[test]
    fn test_arity() {
        assert!(Opcode::SetRef.arity().accepts(2));
        assert!(!Opcode::SetRef.arity().accepts(1));
        assert!(Opcode::Call.arity().accepts(3));
        assert!(!Opcode::Call.arity().accepts(0));
        assert!(Opcode::Return.arity().accepts(0));
    }

    #[test]
    fn test_retarget() {
        let (a, b, c) = (NodeId::new(1), NodeId::new(2), NodeId::new(3));
        let mut op = Opcode::CondBranch {
            if_true: a,
            if_false: a,
        };
        assert_eq!(op.retarget(a, c), 2);
        assert_eq!(op.targets(), vec![c, c]);
        assert_eq!(op.retarget(b, a), 0);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::NewRef.mnemonic(), "new_ref");
        assert_eq!(Opcode::MakeTuple.to_string(), "make_tuple");
        assert_eq!(Opcode::Binary(BinaryOp::Add).to_string(), "add");
        assert_eq!(Opcode::Unary(UnaryOp::Not).to_string(), "not");
        assert_eq!(Opcode::Branch(NodeId::new(4)).to_string(), "branch b4");
    }
}
