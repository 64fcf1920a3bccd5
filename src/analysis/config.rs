//! Analysis configuration
//!
//! [`AnalysisConfig`] controls how strictly the CFG builder validates its input and how
//! the [`crate::analysis::AnalysisCache`] schedules work. The defaults suit decoded
//! class files; [`AnalysisConfig::strict`] is meant for hand-built instruction streams in
//! tests.

/// How the CFG builder treats instructions that are not reachable from method-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreachablePolicy {
    /// Every unreachable instruction is an invariant violation.
    Reject,
    /// Unreachable instructions are tolerated if a handler entry reaches them.
    ///
    /// Compilers emit catch blocks whose protected range cannot throw; those blocks are
    /// dead but well-formed.
    #[default]
    AllowHandlerCode,
    /// Unreachable instructions are always tolerated.
    Allow,
}

/// Configuration for per-method graph construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Treatment of instructions not reachable from method-entry
    pub unreachable: UnreachablePolicy,
    /// Attach `"T"`/`"F"` labels to the outgoing edges of conditional branches
    pub label_branches: bool,
    /// Analyse batches of methods on the rayon thread pool
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            unreachable: UnreachablePolicy::AllowHandlerCode,
            label_branches: true,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Creates a configuration that rejects any unreachable instruction.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            unreachable: UnreachablePolicy::Reject,
            ..Self::default()
        }
    }

    /// Creates a configuration that tolerates arbitrary dead code.
    ///
    /// Useful for obfuscated or fuzzed input.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            unreachable: UnreachablePolicy::Allow,
            ..Self::default()
        }
    }

    /// Returns a copy with batch parallelism switched on or off.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_presets() {
        let default = AnalysisConfig::default();
        assert_eq!(default.unreachable, UnreachablePolicy::AllowHandlerCode);
        assert!(default.label_branches);
        assert!(default.parallel);

        assert_eq!(AnalysisConfig::strict().unreachable, UnreachablePolicy::Reject);
        assert_eq!(AnalysisConfig::permissive().unreachable, UnreachablePolicy::Allow);
        assert!(!AnalysisConfig::strict().with_parallel(false).parallel);
    }
}
