// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # irscope
//!
//! The middle and back end of a compiler for a small dynamic scripting
//! language. Front ends emit functions in which every mutable local is a
//! reference cell; `irscope` turns them into SSA form, assigns storage slots
//! to the resulting values and recovers structured control flow for textual
//! or stack-bytecode emitters.
//!
//! ## Features
//!
//! - **Arena IR** - blocks, instructions, phis and values behind stable
//!   handles, with use lists kept consistent by every edit
//! - **Dominance** - cached dominator trees, frontiers and iterated frontiers
//! - **SSA promotion** - cell-to-value promotion with pruned phi placement
//!   and shortcuts for trivial cells
//! - **Slot allocation** - block-granularity liveness, interference graphs
//!   and Welsh-Powell coloring biased towards phi coalescing
//! - **Structuring** - nested `if`/loop groups with explicit jumps as the
//!   fallback for irreducible regions
//! - **Pipeline** - passes, a fixpoint scheduler, a verifier and a
//!   structured event log
//!
//! ## Quick Start
//!
//! ```rust
//! use irscope::prelude::*;
//!
//! // local x = a; if b then x = b end; return x
//! let mut func = Function::new("pick");
//! let entry = func.entry();
//! let then_block = func.add_block();
//! let join = func.add_block();
//! let a = func.add_argument();
//! let b = func.add_argument();
//!
//! let cell = func.new_ref(entry, a)?;
//! func.cond_branch(entry, b, then_block, join)?;
//! func.set_ref(then_block, cell, b)?;
//! func.branch(then_block, join)?;
//! let x = func.get_ref(join, cell)?;
//! func.ret(join, &[x])?;
//!
//! let mut module = Module::new();
//! let id = module.add_function(func);
//!
//! let ctx = CompilerContext::new(CompilerConfig::verifying());
//! PassScheduler::with_default_pipeline().run(&mut module, &ctx)?;
//!
//! assert!(ctx.events.has(EventKind::CellPromoted));
//! assert!(ctx.slot_assignment(id).is_some());
//! assert!(ctx.control_tree(id).is_some());
//! # Ok::<(), irscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - the data model and its editing operations
//! - [`analysis`] - dominance, promotion, liveness and interference
//! - [`compiler`] - allocation, structuring and the pass pipeline
//! - [`utils`] - generic graph algorithms and bit sets
//!
//! All operations are single-threaded and work on one function at a time.
//! Stale handles and broken invariants surface as [`Error`] values rather
//! than panics.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use irscope::prelude::*;
///
/// let mut func = Function::new("f");
/// let entry = func.entry();
/// func.ret(entry, &[])?;
/// func.verify()?;
/// # Ok::<(), irscope::Error>(())
/// ```
pub mod prelude;

/// The block-graph intermediate representation.
///
/// See [`ir::Function`] for the editing API and [`ir::Module`] for
/// compilation units.
pub mod ir;

/// Analyses over the IR: dominance, SSA promotion, liveness and interference.
pub mod analysis;

/// Slot allocation, control-flow structuring and the pass pipeline.
pub mod compiler;

/// Generic graph infrastructure and small data structures.
pub mod utils;

/// `irscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `irscope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use irscope::{ir::Function, Error};
///
/// let mut func = Function::new("f");
/// match func.verify() {
///     Ok(()) => println!("valid"),
///     Err(Error::Verification(violations)) => println!("{} violation(s)", violations.len()),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// A single problem reported by [`ir::Function::verify`].
pub use error::Violation;
