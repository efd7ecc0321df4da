use comfy_table::{Cell, ContentArrangement, Row, Table};

use crate::e_coordinator::{RunReport, RunState};
use crate::e_patterns::PatternTable;
use crate::e_success::Summary;
use crate::e_types::{Category, ClassificationResult};

/// Per-category counts, one row per category that occurred, plus a total.
pub fn category_table(result: &ClassificationResult) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["category", "count"]);
    for category in Category::ALL {
        let count = result.count(category);
        if count > 0 {
            table.add_row(Row::from(vec![
                Cell::new(category.as_str()),
                Cell::new(count),
            ]));
        }
    }
    table.add_row(Row::from(vec![Cell::new("total"), Cell::new(result.len())]));
    table.to_string()
}

/// The active rules in match order.
pub fn pattern_table(patterns: &PatternTable) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(100);
    table.set_header(vec!["#", "category", "severity", "pattern"]);
    for (i, rule) in patterns.iter().enumerate() {
        table.add_row(Row::from(vec![
            Cell::new(i + 1),
            Cell::new(rule.category.as_str()),
            Cell::new(rule.severity.as_str()),
            Cell::new(rule.pattern.as_str()),
        ]));
    }
    table.to_string()
}

/// One line describing what the stdout parser found.
pub fn summary_line(summary: &Summary) -> String {
    match summary {
        Summary::Built {
            package, modules, ..
        } => format!(
            "built {} ({} module(s))",
            package.as_deref().unwrap_or("package"),
            modules.len()
        ),
        Summary::Tested {
            total,
            passed,
            failed,
            ..
        } => format!("{} test(s): {} passed, {} failed", total, passed, failed),
        Summary::Published {
            transaction_hash, ..
        } => format!(
            "published, transaction {}",
            transaction_hash.as_deref().unwrap_or("unknown")
        ),
        Summary::Accounts { entries } => format!("{} account(s)", entries.len()),
        Summary::CliError { message } => format!("aptos error: {}", message),
        Summary::Output { lines } => format!("{} line(s) of output", lines.len()),
        Summary::ParseFailure { reason } => format!("output could not be parsed: {}", reason),
    }
}

/// A short textual report of a finished run.
pub fn run_report(report: &RunReport) -> String {
    let state = match report.state {
        RunState::Succeeded => "succeeded",
        RunState::Failed => "failed",
        RunState::TimedOut => "timed out",
    };
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(100);
    let rows = [
        ("command", report.command.clone()),
        (
            "started",
            report.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("elapsed", format!("{:.2}s", report.elapsed.as_secs_f64())),
        ("state", state.to_string()),
        (
            "exit code",
            report
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("diagnostics", report.diagnostics.len().to_string()),
        ("summary", summary_line(&report.summary)),
    ];
    for (key, value) in rows {
        table.add_row(Row::from(vec![Cell::new(key), Cell::new(value)]));
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e_types::{Diagnostic, Severity};

    #[test]
    fn category_table_lists_only_present_categories() {
        let mut result = ClassificationResult::new();
        result.push(Diagnostic::unlocated(Severity::Error, Category::Borrow, "x"));
        result.push(Diagnostic::unlocated(Severity::Error, Category::Borrow, "y"));
        let text = category_table(&result);
        assert!(text.contains("borrow"));
        assert!(text.contains("total"));
        assert!(!text.contains("runtime"));
    }

    #[test]
    fn pattern_table_numbers_rules() {
        let text = pattern_table(&PatternTable::default_move());
        assert!(text.contains("syntax"));
        assert!(text.contains("runtime"));
    }
}
