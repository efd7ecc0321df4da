use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The `source` tag carried by every diagnostic produced by the classifier.
pub const DIAGNOSTIC_SOURCE: &str = "move_compiler";

/// Coarse classification of where a diagnostic comes from.
///
/// The declaration order is also the display order in summaries.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Syntax,
    Type,
    Borrow,
    Resource,
    Module,
    Compilation,
    Runtime,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Syntax,
        Category::Type,
        Category::Borrow,
        Category::Resource,
        Category::Module,
        Category::Compilation,
        Category::Runtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Syntax => "syntax",
            Category::Type => "type",
            Category::Borrow => "borrow",
            Category::Resource => "resource",
            Category::Module => "module",
            Category::Compilation => "compilation",
            Category::Runtime => "runtime",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category `{}`", s))
    }
}

/// Severity of a diagnostic, mirroring the four levels an editor understands.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            "info" | "note" => Ok(Severity::Info),
            "hint" | "help" => Ok(Severity::Hint),
            other => Err(format!("unknown severity `{}`", other)),
        }
    }
}

/// One classified problem found in tool output.
///
/// `line` and `column` are 0-based. When the source line carried no
/// `line:column` token the diagnostic is *unlocated*: `located` is false and
/// the position is the `(0, 0)` sentinel, which must not be used to place a
/// marker in a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
    pub source: &'static str,
    pub category: Category,
    pub located: bool,
}

impl Diagnostic {
    /// A diagnostic at a 0-based position.
    pub fn located(
        line: u32,
        column: u32,
        severity: Severity,
        category: Category,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            line,
            column,
            severity,
            message: message.into(),
            source: DIAGNOSTIC_SOURCE,
            category,
            located: true,
        }
    }

    /// A diagnostic without a usable position.
    pub fn unlocated(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Diagnostic {
            line: 0,
            column: 0,
            severity,
            message: message.into(),
            source: DIAGNOSTIC_SOURCE,
            category,
            located: false,
        }
    }

    /// The 1-based `line:column` label as it appeared in the tool output.
    pub fn position_label(&self) -> Option<String> {
        if self.located {
            Some(format!("{}:{}", self.line + 1, self.column + 1))
        } else {
            None
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position_label() {
            Some(pos) => write!(
                f,
                "{} {}[{}] {}",
                pos, self.severity, self.category, self.message
            ),
            None => write!(f, "-:- {}[{}] {}", self.severity, self.category, self.message),
        }
    }
}

/// Ordered diagnostics from one classification run plus per-category counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub counts: BTreeMap<Category, usize>,
}

impl ClassificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic, keeping `counts` in step.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        *self.counts.entry(diagnostic.category).or_insert(0) += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Appends everything from `other` after the current diagnostics.
    pub fn merge(&mut self, other: ClassificationResult) {
        for diag in other.diagnostics {
            self.push(diag);
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn count(&self, category: Category) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.severity_count(Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn located(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.located)
    }

    pub fn unlocated(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.located)
    }
}
