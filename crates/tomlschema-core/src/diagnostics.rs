//! Diagnostics for TOML documents
//!
//! Positioned, severity-tagged findings surfaced to the editor. Every
//! validation pass produces a full replacement set; nothing here is
//! accumulated across passes.
//!
//! # Example
//!
//! ```
//! use tomlschema_core::diagnostics::{Diagnostic, Severity, Span};
//!
//! let diag = Diagnostic::syntax_error("unterminated array", Span::new(3, 0, 12));
//! assert_eq!(diag.severity, Severity::Error);
//! assert_eq!(diag.source.as_str(), "toml-syntax");
//! ```

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A potential issue; the document remains usable
    Warning,
    /// A problem that must be fixed
    Error,
}

/// Which phase of a validation pass produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticSource {
    /// The TOML parser rejected the document
    TomlSyntax,
    /// The document parsed but violates its schema
    TomlSchema,
}

impl DiagnosticSource {
    /// The source string published alongside the diagnostic
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticSource::TomlSyntax => "toml-syntax",
            DiagnosticSource::TomlSchema => "toml-schema",
        }
    }
}

/// A single-line range in a document
///
/// Lines and columns are 0-indexed; the column range is half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Line the finding is on
    pub line: u32,
    /// Start column (inclusive)
    pub start: u32,
    /// End column (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span on a single line
    pub fn new(line: u32, start: u32, end: u32) -> Self {
        Self { line, start, end }
    }
}

/// A positioned finding from a validation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Where the finding is anchored
    pub span: Span,
    /// Severity level
    pub severity: Severity,
    /// Phase that produced the finding
    pub source: DiagnosticSource,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a syntax finding (severity Error, source `toml-syntax`)
    pub fn syntax_error(message: impl Into<String>, span: Span) -> Self {
        Self {
            span,
            severity: Severity::Error,
            source: DiagnosticSource::TomlSyntax,
            message: message.into(),
        }
    }

    /// Create a schema finding (severity Warning, source `toml-schema`)
    pub fn schema_warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            span,
            severity: Severity::Warning,
            source: DiagnosticSource::TomlSchema,
            message: message.into(),
        }
    }

    /// Check if this is an error-level diagnostic
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

/// Convert a byte offset into a 0-indexed (line, column) pair
///
/// Columns count characters, not bytes. Offsets past the end of the text
/// resolve to the final position.
pub fn position_at(text: &str, offset: usize) -> (u32, u32) {
    let mut line = 0u32;
    let mut column = 0u32;

    for (i, ch) in text.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    (line, column)
}
