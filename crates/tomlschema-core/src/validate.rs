//! Validation orchestration
//!
//! One pass per trigger: syntax check first, then schema validation when a
//! governing schema resolves. The returned set replaces the document's
//! previous diagnostics wholesale — a pass that finds nothing still
//! publishes an empty set.

use std::path::Path;
use std::sync::OnceLock;

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SchemaSettings;
use crate::diagnostics::{position_at, Diagnostic, Span};
use crate::locator;
use crate::store::SchemaStore;

fn reported_position_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"at line (\d+)(?:, column (\d+))?").unwrap())
}

/// Run a full validation pass over `text`.
///
/// A syntax failure yields exactly one diagnostic and ends the pass. With
/// valid syntax and validation enabled, the governing schema (if any) is
/// located, resolved, and applied; schema load failures degrade to "no
/// schema" rather than surfacing to the document.
pub async fn validate(
    text: &str,
    document_path: Option<&Path>,
    settings: &SchemaSettings,
    store: &mut SchemaStore,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let parsed = match toml::from_str::<toml::Value>(text) {
        Ok(value) => Some(value),
        Err(error) => {
            debug!("TOML syntax check failed: {}", error.message());
            diagnostics.push(syntax_diagnostic(&error, text));
            None
        }
    };

    let Some(parsed) = parsed else {
        return diagnostics;
    };
    if !settings.enable_validation {
        return diagnostics;
    }
    let Some(uri) = locator::locate(text, document_path, &settings.associations) else {
        debug!("no schema governs this document");
        return diagnostics;
    };

    let record = match store.resolve(&uri, document_path).await {
        Ok(record) => record,
        Err(error) => {
            warn!("schema unavailable for {uri}: {error}");
            return diagnostics;
        }
    };

    let instance = toml_to_json(parsed);
    let anchor = schema_anchor(text);
    for error in record.compiled.iter_errors(&instance) {
        diagnostics.push(Diagnostic::schema_warning(schema_message(&error), anchor));
    }

    diagnostics
}

/// Build the single syntax diagnostic for a parse failure.
///
/// The parser's structured span is preferred; the rendered message's
/// `at line L[, column C]` clause is the fallback. Positions that cannot be
/// recovered or land outside the document anchor at the start with an
/// approximate-position note.
fn syntax_diagnostic(error: &toml::de::Error, text: &str) -> Diagnostic {
    let mut message = format!("TOML Syntax Error: {}", error.message());

    let position = error
        .span()
        .map(|span| position_at(text, span.start))
        .or_else(|| extract_reported_position(&error.to_string()));

    let line_count = text.lines().count();
    match position {
        Some((line, column)) if (line as usize) < line_count => {
            let line_text = text.lines().nth(line as usize).unwrap_or("");
            let end = (line_text.chars().count() as u32).max(column + 1);
            Diagnostic::syntax_error(message, Span::new(line, column, end))
        }
        _ => {
            message.push_str(" (position approximate)");
            Diagnostic::syntax_error(message, Span::new(0, 0, 1))
        }
    }
}

/// Pull a 1-based `at line L[, column C]` position out of a rendered error,
/// converted to 0-based.
fn extract_reported_position(rendered: &str) -> Option<(u32, u32)> {
    let caps = reported_position_regex().captures(rendered)?;
    let line: u32 = caps.get(1)?.as_str().parse().ok()?;
    if line < 1 {
        return None;
    }
    let column = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|column| *column >= 1)
        .map(|column| column - 1)
        .unwrap_or(0);
    Some((line - 1, column))
}

/// Range schema diagnostics anchor to: the `$schema` directive when the
/// document carries one, otherwise the first line.
fn schema_anchor(text: &str) -> Span {
    if let Some(directive) = locator::find_directive(text) {
        return Span::new(directive.line, directive.start, directive.end);
    }
    let first_line_len = text.lines().next().map(|l| l.chars().count()).unwrap_or(0) as u32;
    Span::new(0, 0, first_line_len.max(1))
}

/// Compose the message for one validator error.
fn schema_message(error: &ValidationError<'_>) -> String {
    let mut message = format!("Schema Validation: {error}");

    let instance_path = error.instance_path().to_string();
    let toml_path = if instance_path.is_empty() {
        "(root)".to_string()
    } else {
        instance_path.trim_start_matches('/').replace('/', ".")
    };
    message.push_str(&format!(" (at TOML path: {toml_path})"));

    match error.kind() {
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            for property in unexpected {
                message.push_str(&format!(" - Unexpected property: \"{property}\""));
            }
        }
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            message.push_str(&format!(" - Missing required property: \"{name}\""));
        }
        _ => {}
    }

    message
}

/// Convert a parsed TOML value to JSON for schema validation.
///
/// Datetimes become their string rendering; TOML has no other type without
/// a JSON counterpart.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
