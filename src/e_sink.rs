use nu_ansi_term::{Color, Style};
use std::fmt;
use std::io::{self, Write};

use crate::e_types::{ClassificationResult, Diagnostic, Severity};

/// Identifies where diagnostics belong: a buffer in an editor, a project in a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(pub String);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warn,
    Error,
}

/// A one-line user-visible notice about an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Notification {
            level: NotifyLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Notification {
            level: NotifyLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification {
            level: NotifyLevel::Error,
            message: message.into(),
        }
    }
}

/// Receives classification results and notices. Rendering is entirely the sink's business.
pub trait DiagnosticSink {
    fn publish(&mut self, buffer: &BufferId, result: &ClassificationResult);
    fn notify(&mut self, notification: &Notification);
}

/// Keeps everything it is given. Useful for embedding and for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub published: Vec<(BufferId, ClassificationResult)>,
    pub notifications: Vec<Notification>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for CollectingSink {
    fn publish(&mut self, buffer: &BufferId, result: &ClassificationResult) {
        self.published.push((buffer.clone(), result.clone()));
    }

    fn notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}

/// Prints diagnostics to a writer (stdout by default).
///
/// Located diagnostics are printed as `buffer:line:col`; unlocated ones are
/// listed separately and never given a position.
pub struct TerminalSink<W: Write = io::Stdout> {
    out: W,
    color: bool,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        TerminalSink {
            out: io::stdout(),
            color,
        }
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        TerminalSink { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint_severity(&self, severity: Severity) -> String {
        let label = severity.as_str();
        if !self.color {
            return label.to_string();
        }
        match severity {
            Severity::Error => Color::Red.bold().paint(label).to_string(),
            Severity::Warn => Color::Yellow.paint(label).to_string(),
            Severity::Info => Color::Green.paint(label).to_string(),
            Severity::Hint => Color::Purple.paint(label).to_string(),
        }
    }

    fn write_diagnostic(&mut self, prefix: &str, diag: &Diagnostic) -> io::Result<()> {
        let severity = self.paint_severity(diag.severity);
        let prefix = if self.color && !prefix.is_empty() {
            Style::new().underline().paint(prefix).to_string()
        } else {
            prefix.to_string()
        };
        writeln!(
            self.out,
            "{} {}[{}]: {}",
            prefix, severity, diag.category, diag.message
        )
    }

    fn render(&mut self, buffer: &BufferId, result: &ClassificationResult) -> io::Result<()> {
        for diag in result.located() {
            let pos = diag.position_label().unwrap_or_default();
            self.write_diagnostic(&format!("{}:{}", buffer, pos), diag)?;
        }
        let unlocated: Vec<&Diagnostic> = result.unlocated().collect();
        if !unlocated.is_empty() {
            writeln!(self.out, "without position:")?;
            for diag in unlocated {
                self.write_diagnostic("  -", diag)?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write> DiagnosticSink for TerminalSink<W> {
    fn publish(&mut self, buffer: &BufferId, result: &ClassificationResult) {
        if let Err(e) = self.render(buffer, result) {
            log::error!("failed to render diagnostics: {}", e);
        }
    }

    fn notify(&mut self, notification: &Notification) {
        let text = if self.color {
            match notification.level {
                NotifyLevel::Info => Color::Green.paint(&notification.message).to_string(),
                NotifyLevel::Warn => Color::Yellow.paint(&notification.message).to_string(),
                NotifyLevel::Error => Color::Red.paint(&notification.message).to_string(),
            }
        } else {
            notification.message.clone()
        };
        if let Err(e) = writeln!(self.out, "{}", text) {
            log::error!("failed to write notification: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e_types::Category;

    #[test]
    fn terminal_sink_separates_unlocated() {
        let mut result = ClassificationResult::new();
        result.push(Diagnostic::located(
            11,
            4,
            Severity::Error,
            Category::Syntax,
            "error: expected ';'",
        ));
        result.push(Diagnostic::unlocated(
            Severity::Warn,
            Category::Compilation,
            "warning: unused variable 'x'",
        ));
        let mut sink = TerminalSink::new(Vec::new(), false);
        sink.publish(&BufferId("sources/hello.move".into()), &result);
        sink.notify(&Notification::error("build failed"));
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "sources/hello.move:12:5 error[syntax]: error: expected ';'\n\
             without position:\n  \
             - warn[compilation]: warning: unused variable 'x'\n\
             build failed\n"
        );
    }
}
