use console::style;
use std::fmt::Display;

use crate::contract::{ContractIssue, ContractReport};
use crate::gate::GateReport;

/// Styled terminal output for pipeline commands
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl Display) {
        println!("  {:<22} {}", style(format!("{}:", label)).dim(), value);
    }

    /// One contract violation: path first, then what was expected
    pub fn issue(&self, issue: &ContractIssue) {
        eprintln!(
            "{} {} {}",
            style("✗").red(),
            style(&issue.path).cyan(),
            style(format!("[{:?}]", issue.kind)).dim()
        );
        eprintln!(
            "    {} (expected {}, got {})",
            issue.message, issue.expected_type, issue.actual_type
        );
    }

    pub fn contract_report(&self, report: &ContractReport) {
        for issue in &report.issues {
            self.issue(issue);
        }
        if report.is_compatible {
            self.success("Compatible");
        } else {
            self.field("Issues", report.issues.len());
        }
    }

    /// Gate errors, then warnings, then the verdict
    pub fn gate_report(&self, report: &GateReport) {
        for error in &report.errors {
            self.error(error);
        }
        for warning in &report.warnings {
            self.warning(warning);
        }
        if report.is_valid {
            self.success("Ready for report generation");
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
