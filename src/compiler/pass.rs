//! The pass interface of the compiler pipeline.
//!
//! Every transformation or analysis the [`PassScheduler`](crate::compiler::PassScheduler)
//! runs implements [`Pass`]. Passes see one function at a time and report what
//! they did through the shared [`CompilerContext`].

use crate::{
    compiler::context::CompilerContext,
    ir::{Function, FunctionId},
    Result,
};

/// A pass over a single function.
///
/// Passes must be `Send + Sync` so a scheduler can hold them behind shared
/// references. They receive mutable access to the function and shared access
/// to the context; per-function outputs and events go into the context.
pub trait Pass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Should this pass run on a specific function?
    ///
    /// Called before `run_on_function`. Override to skip functions that do
    /// not need this pass.
    fn should_run(&self, _function: FunctionId, _ctx: &CompilerContext) -> bool {
        true
    }

    /// Run the pass on a single function.
    ///
    /// Returns `true` if the function was changed, `false` otherwise. Passes
    /// that only compute results return `false`. Events should be recorded
    /// directly to `ctx.events`.
    ///
    /// # Arguments
    ///
    /// * `func` - The function to process.
    /// * `function` - The id of `func` inside its module.
    /// * `ctx` - The compiler context (shared reference).
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the function.
    fn run_on_function(
        &self,
        func: &mut Function,
        function: FunctionId,
        ctx: &CompilerContext,
    ) -> Result<bool>;

    /// Called once before each sweep over the module.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    fn initialize(&mut self, _ctx: &CompilerContext) -> Result<()> {
        Ok(())
    }

    /// Called once after each sweep over the module.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails.
    fn finalize(&mut self, _ctx: &CompilerContext) -> Result<()> {
        Ok(())
    }

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
