//! Pipeline configuration
//!
//! [`CompilerConfig`] collects the switches the built-in passes and the
//! scheduler read. It is a plain `Copy` value stored in the
//! [`CompilerContext`](crate::compiler::CompilerContext).

use crate::ir::DEFAULT_DOMINANCE_LIMIT;

/// Configuration for the compiler pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CompilerConfig {
    /// Run the verifier on every function after each pass
    /// Collects all violations into one report and aborts the pipeline on failure
    pub verify: bool,

    /// Promote cells captured by closures when no use of the cell follows the capture
    pub promote_captured_cells: bool,

    /// Bias slot coloring so phis share a slot with their sources where legal
    pub coalesce_phi_slots: bool,

    /// Safety cap on dominator fixpoint traversals (default: 1024)
    pub max_dominance_iterations: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            verify: cfg!(debug_assertions),
            promote_captured_cells: true,
            coalesce_phi_slots: true,
            max_dominance_iterations: DEFAULT_DOMINANCE_LIMIT,
        }
    }
}

impl CompilerConfig {
    /// Creates a configuration with every check enabled
    ///
    /// Intended for test suites and debugging passes.
    #[must_use]
    pub fn verifying() -> Self {
        Self {
            verify: true,
            ..Self::default()
        }
    }

    /// Creates a configuration for production builds
    ///
    /// Verification is skipped; everything else keeps its default.
    #[must_use]
    pub fn release() -> Self {
        Self {
            verify: false,
            ..Self::default()
        }
    }

    /// Returns a copy with a different dominator iteration cap
    #[must_use]
    pub fn with_dominance_limit(mut self, limit: usize) -> Self {
        self.max_dominance_iterations = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let verifying = CompilerConfig::verifying();
        assert!(verifying.verify);
        assert!(verifying.promote_captured_cells);
        assert!(verifying.coalesce_phi_slots);

        let release = CompilerConfig::release();
        assert!(!release.verify);
        assert_eq!(release.max_dominance_iterations, DEFAULT_DOMINANCE_LIMIT);
    }

    #[test]
    fn test_default_follows_build_profile() {
        assert_eq!(CompilerConfig::default().verify, cfg!(debug_assertions));
        assert_eq!(
            CompilerConfig::release()
                .with_dominance_limit(8)
                .max_dominance_iterations,
            8
        );
    }
}
