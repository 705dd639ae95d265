//! Verdict output formatting.

use std::path::Path;

use clap::ValueEnum;
use serde_json::json;

use migcheck_core::{AnalysisReport, Reporter, UnsafeOperation};

/// Output format for lint results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per migration file.
    Json,
}

/// Prints per-file verdicts in the selected format.
pub struct VerdictPrinter {
    format: OutputFormat,
}

impl VerdictPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a safe verdict with any accumulated warnings.
    pub fn safe(&self, path: &Path, report: &AnalysisReport) {
        match self.format {
            OutputFormat::Text => {
                println!("{}: SAFE ({} operations)", path.display(), report.operation_count);
                for warning in &report.warnings {
                    self.warning(warning);
                }
            }
            OutputFormat::Json => {
                let value = json!({
                    "file": path.display().to_string(),
                    "verdict": "safe",
                    "operations": report.operation_count,
                    "warnings": &report.warnings,
                });
                println!("{}", value);
            }
        }
    }

    /// Print an unsafe verdict.
    pub fn unsafe_verdict(&self, path: &Path, error: &UnsafeOperation) {
        match self.format {
            OutputFormat::Text => {
                println!("{}: UNSAFE", path.display());
                self.unsafe_operation(error);
            }
            OutputFormat::Json => {
                let value = json!({
                    "file": path.display().to_string(),
                    "verdict": "unsafe",
                    "rule": error.rule.to_string(),
                    "message": &error.message,
                    "remediation": &error.remediation,
                });
                println!("{}", value);
            }
        }
    }
}

impl Reporter for VerdictPrinter {
    fn unsafe_operation(&self, error: &UnsafeOperation) {
        for line in error.message.lines() {
            println!("  {}", line);
        }
        if let Some(remediation) = &error.remediation {
            println!();
            for line in remediation.lines() {
                println!("  {}", line);
            }
        }
    }

    fn warning(&self, message: &str) {
        println!("  warning: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migcheck_core::RuleId;

    #[test]
    fn test_printer_handles_multi_line_messages() {
        let printer = VerdictPrinter::new(OutputFormat::Text);
        printer.unsafe_verdict(
            Path::new("20260830_add_fk.json"),
            &UnsafeOperation {
                rule: RuleId::AddForeignKey,
                message: "line one\nline two".into(),
                remediation: Some("snippet".into()),
            },
        );
    }
}
