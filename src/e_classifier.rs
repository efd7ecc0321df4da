use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_patterns::PatternTable;
use crate::e_types::{ClassificationResult, Diagnostic};

static POSITION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+):(\d+)").expect("static regex"));

/// Extracts the first `line:column` token of `line` as 0-based coordinates.
///
/// A zero or out-of-range component means the token cannot name a buffer
/// position, so it is reported as absent.
pub fn extract_position(line: &str) -> Option<(u32, u32)> {
    let caps = POSITION.captures(line)?;
    let row = caps[1].parse::<u32>().ok()?;
    let col = caps[2].parse::<u32>().ok()?;
    Some((row.checked_sub(1)?, col.checked_sub(1)?))
}

/// Classifies captured output lines against `table`.
///
/// Each line produces at most one diagnostic, from the first rule that matches
/// it; lines no rule matches are dropped. Diagnostics keep input order.
pub fn classify<S: AsRef<str>>(lines: &[S], table: &PatternTable) -> ClassificationResult {
    let mut result = ClassificationResult::new();
    for raw in lines {
        let line = raw.as_ref();
        let Some(rule) = table.first_match(line) else {
            continue;
        };
        let message = line.trim();
        let diag = match extract_position(line) {
            Some((row, col)) => {
                Diagnostic::located(row, col, rule.severity, rule.category, message)
            }
            None => Diagnostic::unlocated(rule.severity, rule.category, message),
        };
        log::trace!("classified {:?} as {}/{}", message, rule.category, rule.severity);
        result.push(diag);
    }
    result
}

/// Splits a captured buffer into lines and classifies them.
pub fn classify_text(text: &str, table: &PatternTable) -> ClassificationResult {
    let lines: Vec<&str> = text.lines().collect();
    classify(&lines, table)
}
