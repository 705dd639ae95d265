//! Analyzer error type.

use thiserror::Error;

use crate::rules::{RuleId, Violation};

/// An unsafe migration operation was detected.
///
/// Raised at the moment the rule engine produces the first unsafe verdict
/// for a unit; the unit is aborted and no further operations are recorded,
/// mirroring the all-or-nothing semantics of an aborted DDL transaction.
#[derive(Debug, Clone, Error)]
#[error(
    "unsafe migration operation detected ({rule}):\n{message}{}",
    format_remediation(.remediation)
)]
pub struct UnsafeOperation {
    /// The rule that fired.
    pub rule: RuleId,
    /// Human-readable explanation of the danger.
    pub message: String,
    /// Literal remediation snippet, when one applies.
    pub remediation: Option<String>,
}

fn format_remediation(remediation: &Option<String>) -> String {
    match remediation {
        Some(snippet) => format!("\n\n{}", snippet),
        None => String::new(),
    }
}

impl From<Violation> for UnsafeOperation {
    fn from(violation: Violation) -> Self {
        Self {
            rule: violation.rule,
            message: violation.message,
            remediation: violation.remediation,
        }
    }
}
