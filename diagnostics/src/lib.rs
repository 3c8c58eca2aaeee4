//! Diagnostics library for compiler error and warning reporting
//!
//! This library provides Rust-style diagnostics with:
//! - Multiple severity levels (Error, Warning, Info, Hint)
//! - Source code snippets with highlighting
//! - Multi-file source map support
//!
//! Backend passes (escape analysis, liveness) push into a `Diagnostics`
//! collection; the driver formats the batch at the end of compilation.

use std::fmt;

pub mod gc;

// Re-export source mapping types from the source_map crate
pub use source_map::{FileId, SourceFile, SourceMap, SourcePosition, SourceSpan};

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

/// Style for diagnostic labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Primary,
    Secondary,
}

/// A label that points to a span of code
#[derive(Debug, Clone)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
    pub style: LabelStyle,
}

impl Label {
    pub fn primary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    pub fn secondary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

/// A diagnostic message with severity, labels, and notes
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub span: SourceSpan,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

/// Collection of diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }
}

/// Builder for creating diagnostics
pub struct DiagnosticBuilder {
    severity: DiagnosticSeverity,
    code: Option<String>,
    message: String,
    span: SourceSpan,
    labels: Vec<Label>,
    notes: Vec<String>,
    help: Vec<String>,
}

impl DiagnosticBuilder {
    pub fn error(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Warning, message, span)
    }

    pub fn info(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Info, message, span)
    }

    fn new(severity: DiagnosticSeverity, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            span,
            labels: vec![],
            notes: vec![],
            help: vec![],
        }
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    pub fn secondary_label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn help(mut self, help_msg: impl Into<String>) -> Self {
        self.help.push(help_msg.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            severity: self.severity,
            code: self.code,
            message: self.message,
            span: self.span,
            labels: self.labels,
            notes: self.notes,
            help: self.help,
        }
    }
}

/// Formatter for displaying diagnostics
#[derive(Default)]
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics, source_map: &SourceMap) -> String {
        let mut output = String::new();

        for (i, diagnostic) in diagnostics.diagnostics.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&self.format_diagnostic(diagnostic, source_map));
        }

        output
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let mut output = String::new();

        if self.use_colors {
            let color = match diagnostic.severity {
                DiagnosticSeverity::Error => "\x1b[31m",
                DiagnosticSeverity::Warning => "\x1b[33m",
                DiagnosticSeverity::Info => "\x1b[36m",
                DiagnosticSeverity::Hint => "\x1b[32m",
            };
            output.push_str(color);
            output.push_str(&format!("{}", diagnostic.severity));
            if let Some(code) = &diagnostic.code {
                output.push_str(&format!("[{}]", code));
            }
            output.push_str("\x1b[0m: \x1b[1;97m");
            output.push_str(&diagnostic.message);
            output.push_str("\x1b[0m\n");
        } else {
            output.push_str(&format!("{}", diagnostic.severity));
            if let Some(code) = &diagnostic.code {
                output.push_str(&format!("[{}]", code));
            }
            output.push_str(&format!(": {}\n", diagnostic.message));
        }

        // Source location and snippet
        if let Some(file) = source_map.get_file(diagnostic.span.file_id) {
            output.push_str(&format!(
                "  --> {}:{}:{}\n",
                file.name, diagnostic.span.start.line, diagnostic.span.start.column
            ));

            let line_num = diagnostic.span.start.line;
            if let Some(line) = source_map.get_line(diagnostic.span.file_id, line_num) {
                let width = line_num.to_string().len();
                output.push_str(&format!("{:width$} |\n", "", width = width));
                output.push_str(&format!("{} | {}\n", line_num, line));

                let padding = " ".repeat(diagnostic.span.start.column.saturating_sub(1));
                let underline_len = if diagnostic.span.start.line == diagnostic.span.end.line {
                    diagnostic
                        .span
                        .end
                        .column
                        .saturating_sub(diagnostic.span.start.column)
                        .max(1)
                } else {
                    1
                };
                output.push_str(&format!(
                    "{:width$} | {}{}\n",
                    "",
                    padding,
                    "^".repeat(underline_len),
                    width = width
                ));
            }
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("  = note: {}\n", note));
        }
        for help in &diagnostic.help {
            output.push_str(&format!("  = help: {}\n", help));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> SourceSpan {
        SourceSpan::single_position(SourcePosition::new(1, 5, 4), FileId::new(0))
    }

    #[test]
    fn test_builder() {
        let d = DiagnosticBuilder::error("something bad", span())
            .code("E0100")
            .note("more context")
            .build();
        assert_eq!(d.severity, DiagnosticSeverity::Error);
        assert_eq!(d.code.as_deref(), Some("E0100"));
        assert_eq!(d.notes.len(), 1);
    }

    #[test]
    fn test_collection_filters() {
        let mut diags = Diagnostics::new();
        diags.push(DiagnosticBuilder::error("e", span()).build());
        diags.push(DiagnosticBuilder::warning("w", span()).build());
        assert!(diags.has_errors());
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_format_without_file() {
        let fmt = ErrorFormatter::new();
        let map = SourceMap::new();
        let d = DiagnosticBuilder::warning("x is ambiguously live", span()).build();
        let text = fmt.format_diagnostic(&d, &map);
        assert!(text.starts_with("warning: x is ambiguously live"));
    }
}
