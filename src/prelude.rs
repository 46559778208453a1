//! # irscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits of the library. Import it to get quick access to everything
//! needed to build functions and run the pipeline.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all irscope operations
pub use crate::Error;

/// The result type used throughout irscope
pub use crate::Result;

/// A single problem reported by the verifier
pub use crate::Violation;

// ================================================================================================
// IR
// ================================================================================================

/// Functions, modules and their building blocks
pub use crate::ir::{
    BinaryOp, Capture, ConstantPool, Function, FunctionId, InstId, Literal, Module, Opcode, PhiId,
    UnaryOp, User, ValueId, ValueKind,
};

/// Block handle and graph traits
pub use crate::utils::graph::{NodeId, Predecessors, RootedGraph, Successors};

// ================================================================================================
// Analyses
// ================================================================================================

/// Dominance, promotion, liveness and interference
pub use crate::analysis::{
    Dominance, InterferenceGraph, Liveness, Outcome, Promotion, Rejection, SsaPromoter,
};

// ================================================================================================
// Compiler Pipeline
// ================================================================================================

/// Allocation and structuring
pub use crate::compiler::{ControlNode, ControlTree, SlotAllocator, SlotAssignment};

/// Passes, scheduling and diagnostics
pub use crate::compiler::{
    CompilerConfig, CompilerContext, EventKind, EventLog, Pass, PassScheduler,
};
