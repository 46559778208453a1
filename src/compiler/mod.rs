//! Back-end lowering stages and the pass pipeline.
//!
//! This module sits between the analyses and an emitter:
//!
//! - [`crate::analysis`] - dominance, SSA promotion, liveness, interference
//! - [`compiler`](self) - slot allocation, control-flow structuring, passes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilerContext              Shared state of one run            │
//! │    ├─ CompilerConfig          (verification, coalescing, caps)   │
//! │    ├─ Slot assignments        (per function)                     │
//! │    ├─ Control trees           (per function)                     │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  PassScheduler               Fixpoint execution                  │
//! │    └─ every pass over every function, verify, repeat until stable│
//! │                                                                  │
//! │  Pass trait                  Interface for all passes            │
//! │    ├─ run_on_function()       Per-function work                  │
//! │    ├─ initialize()            Setup before each sweep            │
//! │    └─ finalize()              Cleanup after each sweep           │
//! │                                                                  │
//! │  Passes (4 built-in)                                             │
//! │    ├─ UnreachableBlockPass    dead block removal                 │
//! │    ├─ PromotionPass           cells → SSA values                 │
//! │    ├─ AllocationPass          Welsh-Powell slot coloring         │
//! │    └─ StructuringPass         nested if/loop groups              │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use irscope::compiler::{CompilerConfig, CompilerContext, PassScheduler};
//!
//! let ctx = CompilerContext::new(CompilerConfig::verifying());
//! PassScheduler::with_default_pipeline().run(&mut module, &ctx)?;
//! println!("{}", ctx.events.summary());
//! ```

mod alloc;
mod config;
mod context;
mod events;
mod pass;
mod passes;
mod scheduler;
mod structure;

pub use alloc::{SlotAllocator, SlotAssignment};
pub use config::CompilerConfig;
pub use context::CompilerContext;
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use pass::Pass;
pub use passes::{AllocationPass, PromotionPass, StructuringPass, UnreachableBlockPass};
pub use scheduler::PassScheduler;
pub use structure::{ControlGroup, ControlNode, ControlTree, GroupId, Jump};
