use std::fmt;

use thiserror::Error;

use crate::{
    ir::{FunctionId, InstId, PhiId, ValueId},
    utils::graph::NodeId,
};

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Invariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Invariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// A single problem found by the IR verifier.
///
/// Violations are collected rather than raised one at a time, so a single
/// verifier run reports every broken invariant in a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the function the violation was found in.
    pub function: String,
    /// Offending block, if the violation is tied to one.
    pub block: Option<NodeId>,
    /// Offending instruction, if the violation is tied to one.
    pub instruction: Option<InstId>,
    /// Human-readable description of what is wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function)?;
        if let Some(block) = self.block {
            write!(f, " {block}")?;
        }
        if let Some(inst) = self.instruction {
            write!(f, " {inst}")?;
        }
        write!(f, ": {}", self.message)
    }
}

fn format_violations(violations: &[Violation]) -> String {
    let mut out = format!("{} IR violation(s)", violations.len());
    for violation in violations {
        out.push_str("\n  - ");
        out.push_str(&violation.to_string());
    }
    out
}

/// The generic Error type, which covers every failure this library can report.
///
/// All variants are compiler-internal: they indicate a defect in a pass or in
/// the IR handed to the core, never a problem in the user's source program.
///
/// # Error Categories
///
/// ## Structural Errors
/// - [`Error::Invariant`] - A hard IR invariant would have been broken
/// - [`Error::TerminatorExists`] - Attempted to add code after a terminator
/// - [`Error::ValueInUse`] - Attempted to destroy a value that still has consumers
///
/// ## Stale Handles
/// - [`Error::BlockNotFound`], [`Error::InstructionNotFound`],
///   [`Error::PhiNotFound`], [`Error::ValueNotFound`], [`Error::FunctionNotFound`]
///
/// ## Verification
/// - [`Error::Verification`] - Aggregate report from the IR verifier
#[derive(Error, Debug)]
pub enum Error {
    /// An operation would have violated a hard IR invariant.
    ///
    /// The error records the source location where the violation was detected
    /// so that the defective pass can be tracked down.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the broken invariant
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Invariant - {file}:{line}: {message}")]
    Invariant {
        /// The message to be printed for the Invariant error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An instruction was added to a block that already ends in a terminator.
    #[error("Block {0} already ends in a terminator")]
    TerminatorExists(NodeId),

    /// A value was destroyed while consumers still reference it.
    ///
    /// The associated count is the number of unique consumers left.
    #[error("Value {0} still has {1} consumer(s)")]
    ValueInUse(ValueId, usize),

    /// A block handle refers to a removed or never-allocated block.
    #[error("Block {0} does not exist")]
    BlockNotFound(NodeId),

    /// An instruction handle refers to a removed or never-allocated instruction.
    #[error("Instruction {0} does not exist")]
    InstructionNotFound(InstId),

    /// A phi handle refers to a removed or never-allocated phi node.
    #[error("Phi {0} does not exist")]
    PhiNotFound(PhiId),

    /// A value handle refers to a destroyed or never-allocated value.
    #[error("Value {0} does not exist")]
    ValueNotFound(ValueId),

    /// A function id does not belong to the module.
    #[error("Function {0} does not exist")]
    FunctionNotFound(FunctionId),

    /// The verifier found one or more broken invariants.
    ///
    /// Every violation found during the walk is included, not only the first.
    #[error("{}", format_violations(.0))]
    Verification(Vec<Violation>),
}
