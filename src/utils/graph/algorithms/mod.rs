//! Graph algorithms over the traits in [`crate::utils::graph`].
//!
//! - [`preorder`] / [`postorder`] - iterative depth-first orders
//! - [`compute_dominators`] - iterative immediate-dominator fixpoint
//! - [`compute_dominance_frontiers`] - single postorder pass over the dominator tree

mod dominators;
mod traversal;

pub use dominators::{
    compute_dominance_frontiers, compute_dominators, DominatorIterator, DominatorTree,
};
pub use traversal::{postorder, preorder, reverse_postorder};
