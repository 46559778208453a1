//! Shared data structures used by the IR and the analyses.

mod bitset;
pub mod graph;

pub use bitset::BitSet;
