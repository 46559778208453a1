//! Pass scheduler for orchestrating pass execution.
//!
//! The `PassScheduler` runs an ordered list of passes over every function of
//! a [`Module`], repeating the whole list until no pass reports a change or
//! the iteration limit is reached.

use crate::{
    compiler::{
        context::CompilerContext,
        pass::Pass,
        passes::{AllocationPass, PromotionPass, StructuringPass, UnreachableBlockPass},
        EventKind,
    },
    ir::Module,
    Result,
};

/// Orchestrates pass execution over a module.
///
/// Each iteration runs every pass, in insertion order, over every function
/// in id order. When [`CompilerConfig::verify`](crate::compiler::CompilerConfig::verify)
/// is set, each function is verified after each pass and the first failure
/// aborts the run.
pub struct PassScheduler {
    /// Maximum iterations of the whole pass list.
    max_iterations: usize,
    /// Passes in execution order.
    passes: Vec<Box<dyn Pass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PassScheduler {
    /// Creates an empty scheduler with the given iteration limit.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum iterations of the pass list before stopping.
    ///
    /// # Returns
    ///
    /// A new `PassScheduler`.
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            passes: Vec::new(),
        }
    }

    /// Creates a scheduler running the built-in pipeline:
    ///
    /// 1. unreachable block removal
    /// 2. SSA promotion
    /// 3. slot allocation
    /// 4. control-flow structuring
    #[must_use]
    pub fn with_default_pipeline() -> Self {
        let mut scheduler = Self::default();
        scheduler
            .add(UnreachableBlockPass::new())
            .add(PromotionPass::new())
            .add(AllocationPass::new())
            .add(StructuringPass::new());
        scheduler
    }

    /// Appends a pass to the pipeline.
    pub fn add(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Returns the pass names in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs all passes once over all functions.
    ///
    /// Returns `true` if any pass made changes, `false` otherwise.
    fn run_passes_once(
        ctx: &CompilerContext,
        passes: &mut [Box<dyn Pass>],
        module: &mut Module,
    ) -> Result<bool> {
        let mut any_changed = false;

        for pass in passes.iter_mut() {
            pass.initialize(ctx)?;
        }

        let functions = module.function_ids();
        for pass in passes.iter() {
            ctx.events
                .record(EventKind::PassStarted)
                .message(pass.name())
                .pass(pass.name());

            let mut changed_functions = 0usize;
            for &id in &functions {
                if !pass.should_run(id, ctx) {
                    continue;
                }

                let func = module.function_mut(id)?;
                if pass.run_on_function(func, id, ctx)? {
                    any_changed = true;
                    changed_functions += 1;
                    ctx.invalidate(id);
                }

                if ctx.config.verify {
                    if let Err(error) = func.verify() {
                        log::error!("{} broke {}: {}", pass.name(), func.name(), error);
                        ctx.events
                            .record(EventKind::VerificationFailed)
                            .function(id)
                            .message(format!("after {}: {}", pass.name(), error))
                            .pass(pass.name());
                        return Err(error);
                    }
                }
            }

            log::debug!(
                "{}: changed {} of {} function(s)",
                pass.name(),
                changed_functions,
                functions.len()
            );
            ctx.events
                .record(EventKind::PassCompleted)
                .message(format!(
                    "{} changed {} function(s)",
                    pass.name(),
                    changed_functions
                ))
                .pass(pass.name());
        }

        for pass in passes.iter_mut() {
            pass.finalize(ctx)?;
        }

        Ok(any_changed)
    }

    /// Runs the pass list over `module` until it stops changing.
    ///
    /// # Arguments
    ///
    /// * `module` - The module whose functions are processed.
    /// * `ctx` - The compiler context.
    ///
    /// # Returns
    ///
    /// The number of iterations completed. Events are accumulated in
    /// `ctx.events`, analysis results in the context's result maps.
    ///
    /// # Errors
    ///
    /// Returns an error if any pass fails, or if verification is enabled and
    /// a pass leaves a function inconsistent.
    pub fn run(&mut self, module: &mut Module, ctx: &CompilerContext) -> Result<usize> {
        for id in module.function_ids() {
            module
                .function_mut(id)?
                .set_dominance_limit(ctx.config.max_dominance_iterations);
        }

        let mut iterations = 0;
        for iteration in 0..self.max_iterations {
            iterations = iteration + 1;
            if !Self::run_passes_once(ctx, &mut self.passes, module)? {
                break;
            }
        }

        Ok(iterations)
    }
}
