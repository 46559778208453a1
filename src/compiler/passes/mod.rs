//! Built-in passes.
//!
//! - [`PromotionPass`] - reference cells to SSA values
//! - [`UnreachableBlockPass`] - deletes blocks the entry cannot reach
//! - [`AllocationPass`] - slot assignment, stored in the context
//! - [`StructuringPass`] - structured control flow, stored in the context

mod allocation;
mod promotion;
mod structuring;
mod unreachable;

pub use allocation::AllocationPass;
pub use promotion::PromotionPass;
pub use structuring::StructuringPass;
pub use unreachable::UnreachableBlockPass;
