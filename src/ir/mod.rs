//! The block-graph intermediate representation.
//!
//! This module holds the data model every analysis and transformation in the
//! crate operates on:
//!
//! - [`Function`] - arena owner of blocks, instructions, phis and values, with
//!   the editing operations that keep use lists consistent
//! - [`Block`] - ordered instruction sequence plus phi set
//! - [`Instruction`] / [`Opcode`] - operations; terminators carry their targets
//! - [`Phi`] - per-predecessor value selection at block entry
//! - [`Value`] - anything consumable, with its multiset of [`User`]s
//! - [`ConstantPool`] / [`Literal`] - module-wide constant interning
//! - [`Module`] - a compilation unit
//!
//! # Input shape
//!
//! Front ends hand over functions in which every mutable local and every
//! captured variable is a Reference-kind cell created by `new_ref` and
//! accessed with `get_ref`, `set_ref` and closure captures. The
//! [`SsaPromoter`](crate::analysis::SsaPromoter) turns those cells into SSA
//! values.
//!
//! # Invariants
//!
//! - every block ends in exactly one terminator and nothing follows it
//! - an operand's definition dominates the consuming instruction (or precedes
//!   it in the same block)
//! - a value or phi is only removed once nothing else consumes it
//! - cached dominance is dropped by every block or edge edit
//!
//! [`Function::verify`] checks all of them.

mod block;
mod builder;
mod constant;
mod function;
pub mod instruction;
mod module;
mod phi;
mod value;
mod verify;

pub use block::Block;
pub use constant::{ConstantId, ConstantPool, Literal};
pub use function::{Function, DEFAULT_DOMINANCE_LIMIT};
pub use instruction::{Arity, BinaryOp, InstId, Instruction, Opcode, UnaryOp};
pub use module::{FunctionId, Module};
pub use phi::{Phi, PhiId};
pub use value::{Capture, User, Value, ValueDef, ValueId, ValueKind};
