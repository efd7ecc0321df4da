//! The ordered rule table the classifier matches output lines against.
//!
//! Rules are plain data. When more than one rule matches a line, the first
//! one in table order wins; there is no "best match" scoring.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

use crate::e_error::{Error, Result};
use crate::e_types::{Category, Severity};

/// One classification rule: a regex plus the category and severity it assigns.
#[derive(Clone)]
pub struct ErrorPattern {
    pub pattern: Regex,
    pub category: Category,
    pub severity: Severity,
}

impl fmt::Debug for ErrorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorPattern")
            .field("pattern", &self.pattern.as_str())
            .field("category", &self.category)
            .field("severity", &self.severity)
            .finish()
    }
}

impl ErrorPattern {
    pub fn new(pattern: &str, category: Category, severity: Severity) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(ErrorPattern {
            pattern,
            category,
            severity,
        })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// A rule as written in `move-e.toml`:
///
/// ```toml
/// [[patterns]]
/// pattern = "^lint:"
/// category = "compilation"
/// severity = "hint"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatternSpec {
    pub pattern: String,
    pub category: String,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "error".to_string()
}

impl PatternSpec {
    pub fn compile(&self) -> Result<ErrorPattern> {
        let category = self
            .category
            .parse::<Category>()
            .map_err(Error::Config)?;
        let severity = self
            .severity
            .parse::<Severity>()
            .map_err(Error::Config)?;
        ErrorPattern::new(&self.pattern, category, severity)
    }
}

// Move compiler error codes are grouped by family: E01 parser, E03 naming,
// E04 typing, E05 abilities, E06/E07 locals and borrows, E11 unit tests.
const DEFAULT_RULES: &[(&str, Category, Severity)] = &[
    (
        r"(?i)^\s*error(?:\[E01\d{3}\])?:\s*(?:unexpected|expected|invalid (?:token|character)|unterminated|syntax)|^\s*error\[E01\d{3}\]:",
        Category::Syntax,
        Severity::Error,
    ),
    (
        r"(?i)^\s*error(?:\[E04\d{3}\])?:\s*(?:incompatible types|mismatched types|type mismatch|invalid type|invalid argument type)|^\s*error\[E04\d{3}\]:",
        Category::Type,
        Severity::Error,
    ),
    (
        r"(?i)^\s*error(?:\[E0[67]\d{3}\])?:\s*.*\b(?:borrow(?:ed)?|reference|use of moved|invalid move|dangling)\b|^\s*error\[E0[67]\d{3}\]:",
        Category::Borrow,
        Severity::Error,
    ),
    (
        r"(?i)^\s*error(?:\[E05\d{3}\])?:\s*.*\b(?:ability|abilities|resource|constraint not satisfied)\b|^\s*error\[E05\d{3}\]:",
        Category::Resource,
        Severity::Error,
    ),
    (
        r"(?i)^\s*error(?:\[E03\d{3}\])?:\s*(?:unbound (?:module|function|struct|type)|unresolved|cyclic|module .* not found|duplicate module)|^\s*error\[E03\d{3}\]:|unable to resolve packages",
        Category::Module,
        Severity::Error,
    ),
    (
        r"(?i)^\s*error\[E11\d{3}\]:|\[\s*FAIL\s*\]|\baborted\b|\babort code\b|EXECUTION_FAILURE|OUT_OF_GAS|ARITHMETIC_ERROR|\btest failure\b",
        Category::Runtime,
        Severity::Error,
    ),
    (
        r"(?i)^\s*error(?:\[E\d+\])?:|compilation failed|failed to compile",
        Category::Compilation,
        Severity::Error,
    ),
    (
        r"(?i)^\s*warning(?:\[W\d+\])?:",
        Category::Compilation,
        Severity::Warn,
    ),
    (r"(?i)^\s*note:", Category::Compilation, Severity::Info),
    (r"(?i)^\s*help:", Category::Compilation, Severity::Hint),
];

static DEFAULT_TABLE: Lazy<PatternTable> = Lazy::new(|| PatternTable {
    rules: DEFAULT_RULES
        .iter()
        .filter_map(|(pattern, category, severity)| {
            match ErrorPattern::new(pattern, *category, *severity) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    log::error!("skipping built-in rule: {}", e);
                    None
                }
            }
        })
        .collect(),
});

/// Ordered set of [`ErrorPattern`]s.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    rules: Vec<ErrorPattern>,
}

impl PatternTable {
    pub fn new(rules: Vec<ErrorPattern>) -> Self {
        PatternTable { rules }
    }

    /// The built-in rules for `aptos move` output.
    pub fn default_move() -> Self {
        DEFAULT_TABLE.clone()
    }

    /// The built-in rules with `extra` placed in front, so user rules win ties.
    pub fn with_extra(extra: &[PatternSpec]) -> Result<Self> {
        let mut rules = extra
            .iter()
            .map(PatternSpec::compile)
            .collect::<Result<Vec<_>>>()?;
        rules.extend(DEFAULT_TABLE.rules.iter().cloned());
        Ok(PatternTable { rules })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorPattern> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule, in table order, whose pattern matches `line`.
    pub fn first_match(&self, line: &str) -> Option<&ErrorPattern> {
        self.rules.iter().find(|rule| rule.is_match(line))
    }
}

impl<'a> IntoIterator for &'a PatternTable {
    type Item = &'a ErrorPattern;
    type IntoIter = std::slice::Iter<'a, ErrorPattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
