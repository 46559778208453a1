//! Analyses over the block-graph IR.
//!
//! Everything here builds on the generic graph infrastructure in
//! [`crate::utils::graph`] and reads functions through their public editing
//! API:
//!
//! - [`cfg`] - frozen successor/predecessor snapshot of a function
//! - [`dominance`] - dominator tree, dominance frontiers, iterated frontiers
//! - [`promote`] - reference-cell to SSA promotion
//! - [`liveness`] - block-granularity liveness of slot-resident values
//! - [`interference`] - interference graph and phi equality classes
//!
//! # Ordering
//!
//! Dominance is derived from the block graph and owned by the function.
//! Every analysis that needs it goes through
//! [`Function::dominance`](crate::ir::Function::dominance), which recomputes
//! it after any block or edge edit.
//!
//! # Usage
//!
//! ```rust,ignore
//! use irscope::analysis::{InterferenceGraph, SsaPromoter};
//!
//! SsaPromoter::new().promote_all(&mut func)?;
//! let graph = InterferenceGraph::build(&mut func)?;
//! ```

pub mod cfg;
pub mod dominance;
pub mod interference;
pub mod liveness;
pub mod promote;

pub use cfg::BlockGraph;
pub use dominance::Dominance;
pub use interference::InterferenceGraph;
pub use liveness::Liveness;
pub use promote::{CellUse, Outcome, Promotion, PromotionStats, Rejection, SsaPromoter};
