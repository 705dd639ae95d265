//! Analysis results and the diagnostic reporting boundary.

use tracing::{error, warn};

use crate::error::UnsafeOperation;

/// Summary of an approved migration unit.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Number of operations analyzed.
    pub operation_count: usize,
    /// Warnings accumulated during analysis (skipped rules).
    pub warnings: Vec<String>,
}

impl AnalysisReport {
    /// Check if any rule was skipped during analysis.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Surface for terminal diagnostics, implemented by the caller.
///
/// Receiving no unsafe operation means the unit proceeds to the executor
/// unmodified; how an unsafe one is surfaced (abort vs. log-only) is the
/// implementor's choice.
pub trait Reporter {
    /// An unsafe verdict terminated the unit.
    fn unsafe_operation(&self, error: &UnsafeOperation);

    /// A non-fatal analysis warning.
    fn warning(&self, message: &str);
}

/// Log-only [`Reporter`] over `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn unsafe_operation(&self, error: &UnsafeOperation) {
        error!(rule = %error.rule, "{}", error);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }
}
