//! Schema-driven completion for TOML documents
//!
//! Turns a cursor position into key or value suggestions by resolving the
//! enclosing table path against the governing schema. The engine
//! distinguishes "no opinion" (`None`) from "nothing matched" (an empty
//! list): callers must not collapse the two.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::walker;

/// What a suggestion completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    /// A table or key name
    Property,
    /// A member of an `enum` constraint
    EnumMember,
    /// A literal value such as `true`
    Value,
}

/// A schema-derived completion suggestion
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Display label
    pub label: String,
    /// Suggestion kind
    pub kind: SuggestionKind,
    /// Short annotation, e.g. the declared type
    pub detail: Option<String>,
    /// Longer documentation from the schema's `description`
    pub documentation: Option<String>,
    /// Text to insert when it differs from the label (quoted strings)
    pub insert_text: Option<String>,
}

fn value_position_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*([A-Za-z0-9_."'-]+)\s*=\s*$"#).unwrap())
}

fn key_position_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z0-9_.-]*)$").unwrap())
}

/// Compute completions at `(line, character)` against a raw schema.
///
/// Returns `None` when the cursor is not in a completable position or the
/// key path does not resolve to a schema node; otherwise the (possibly
/// empty) suggestion list.
pub fn complete(text: &str, line: u32, character: u32, schema: &Value) -> Option<Vec<Suggestion>> {
    let lines: Vec<&str> = text.lines().collect();
    let line_idx = line as usize;
    if line_idx > lines.len() {
        return None;
    }
    let current = lines.get(line_idx).copied().unwrap_or("");
    let char_idx = (character as usize).min(current.len());
    let before = &current[..char_idx];

    let table_path = enclosing_table_path(&lines, line_idx);

    if let Some(caps) = value_position_regex().captures(before) {
        let key = strip_quotes(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
        let mut path = table_path;
        path.extend(key.split('.').map(str::to_string));
        let node = walker::walk(schema, &path)?;
        return Some(value_suggestions(node));
    }

    if let Some(caps) = key_position_regex().captures(before) {
        let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let mut parts: Vec<&str> = prefix.split('.').collect();
        let partial = parts.pop().unwrap_or("");

        let mut path = table_path;
        path.extend(parts.into_iter().map(str::to_string));
        let node = walker::walk(schema, &path)?;
        let node = walker::item_schema(schema, node);
        let properties = node.get("properties").and_then(Value::as_object)?;

        let suggestions = properties
            .iter()
            .filter(|(key, _)| key.starts_with(partial))
            .map(|(key, property)| key_suggestion(key, property))
            .collect();
        return Some(suggestions);
    }

    None
}

/// Scan upward from the cursor for the nearest `[table]` header.
fn enclosing_table_path(lines: &[&str], line_idx: usize) -> Vec<String> {
    for i in (0..line_idx.min(lines.len())).rev() {
        let trimmed = lines[i].trim();
        if trimmed.starts_with('[') {
            let name = trimmed
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim();
            if name.is_empty() {
                return Vec::new();
            }
            return name.split('.').map(str::to_string).collect();
        }
    }
    Vec::new()
}

fn value_suggestions(node: &Value) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if let Some(members) = node.get("enum").and_then(Value::as_array) {
        for member in members {
            suggestions.push(enum_suggestion(member));
        }
    }
    if node.get("type").and_then(Value::as_str) == Some("boolean") {
        for literal in ["true", "false"] {
            suggestions.push(Suggestion {
                label: literal.to_string(),
                kind: SuggestionKind::Value,
                detail: None,
                documentation: None,
                insert_text: None,
            });
        }
    }

    suggestions
}

fn enum_suggestion(member: &Value) -> Suggestion {
    let (label, insert_text) = match member {
        Value::String(s) => (s.clone(), Some(format!("\"{s}\""))),
        other => (other.to_string(), None),
    };
    Suggestion {
        label,
        kind: SuggestionKind::EnumMember,
        detail: Some("Enum value".to_string()),
        documentation: None,
        insert_text,
    }
}

fn key_suggestion(key: &str, property: &Value) -> Suggestion {
    let detail = match property.get("type").and_then(Value::as_str) {
        Some(declared) => format!("Type: {declared}"),
        None => "Property".to_string(),
    };
    Suggestion {
        label: key.to_string(),
        kind: SuggestionKind::Property,
        detail: Some(detail),
        documentation: property
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        insert_text: None,
    }
}

/// Strip one pair of surrounding quotes from a key, if present.
fn strip_quotes(key: &str) -> &str {
    let key = key.strip_prefix(['"', '\'']).unwrap_or(key);
    key.strip_suffix(['"', '\'']).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> Value {
        json!({
            "properties": {
                "name": { "type": "string", "description": "Package name" },
                "nested": {
                    "properties": {
                        "flag": { "type": "boolean" }
                    }
                },
                "server": {
                    "properties": {
                        "host": { "type": "string" },
                        "port": { "type": "integer" },
                        "level": { "type": "string", "enum": ["debug", "info", "warn"] }
                    }
                },
                "fruit": {
                    "type": "array",
                    "items": {
                        "properties": {
                            "name": { "type": "string" },
                            "color": { "type": "string" }
                        }
                    }
                }
            }
        })
    }

    fn labels(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.label.as_str()).collect()
    }

    mod key_position_tests {
        use super::*;

        #[test]
        fn test_root_keys_filtered_by_prefix() {
            let schema = sample_schema();
            let suggestions = complete("na", 0, 2, &schema).unwrap();
            assert_eq!(labels(&suggestions), vec!["name"]);
            assert_eq!(suggestions[0].kind, SuggestionKind::Property);
            assert_eq!(suggestions[0].detail.as_deref(), Some("Type: string"));
            assert_eq!(suggestions[0].documentation.as_deref(), Some("Package name"));
        }

        #[test]
        fn test_empty_prefix_lists_all_keys() {
            let schema = sample_schema();
            let suggestions = complete("", 0, 0, &schema).unwrap();
            assert_eq!(suggestions.len(), 4);
        }

        #[test]
        fn test_table_header_scopes_keys() {
            let schema = sample_schema();
            let text = "[server]\nho";
            let suggestions = complete(text, 1, 2, &schema).unwrap();
            assert_eq!(labels(&suggestions), vec!["host"]);
        }

        #[test]
        fn test_dotted_prefix_extends_path() {
            let schema = sample_schema();
            let suggestions = complete("nested.f", 0, 8, &schema).unwrap();
            assert_eq!(labels(&suggestions), vec!["flag"]);
        }

        #[test]
        fn test_array_of_tables_completes_from_item_schema() {
            let schema = sample_schema();
            let text = "[[fruit]]\n";
            let suggestions = complete(text, 1, 0, &schema).unwrap();
            assert_eq!(labels(&suggestions), vec!["name", "color"]);
        }

        #[test]
        fn test_no_matching_key_gives_empty_list() {
            let schema = sample_schema();
            let suggestions = complete("zzz", 0, 3, &schema).unwrap();
            assert!(suggestions.is_empty());
        }

        #[test]
        fn test_unresolved_table_gives_none() {
            let schema = sample_schema();
            let text = "[unknown]\n";
            assert!(complete(text, 1, 0, &schema).is_none());
        }

        #[test]
        fn test_node_without_properties_gives_none() {
            let schema = sample_schema();
            // `name` is a string leaf; there are no keys beneath it.
            assert!(complete("name.", 0, 5, &schema).is_none());
        }
    }

    mod value_position_tests {
        use super::*;

        #[test]
        fn test_enum_values_suggested_with_quoted_insert() {
            let schema = sample_schema();
            let text = "[server]\nlevel = ";
            let suggestions = complete(text, 1, 8, &schema).unwrap();
            assert_eq!(labels(&suggestions), vec!["debug", "info", "warn"]);
            assert_eq!(suggestions[0].kind, SuggestionKind::EnumMember);
            assert_eq!(suggestions[0].insert_text.as_deref(), Some("\"debug\""));
        }

        #[test]
        fn test_boolean_values_suggested() {
            let schema = sample_schema();
            let text = "nested.flag = ";
            let suggestions = complete(text, 0, 14, &schema).unwrap();
            assert_eq!(labels(&suggestions), vec!["true", "false"]);
            assert_eq!(suggestions[0].kind, SuggestionKind::Value);
        }

        #[test]
        fn test_quoted_key_accepted() {
            let schema = sample_schema();
            let text = "[server]\n\"level\" = ";
            let suggestions = complete(text, 1, 10, &schema).unwrap();
            assert_eq!(suggestions.len(), 3);
        }

        #[test]
        fn test_plain_value_key_gives_empty_list() {
            let schema = sample_schema();
            // `name` resolves but has neither enum nor boolean type.
            let suggestions = complete("name = ", 0, 7, &schema).unwrap();
            assert!(suggestions.is_empty());
        }

        #[test]
        fn test_unresolved_value_key_gives_none() {
            let schema = sample_schema();
            assert!(complete("unknown = ", 0, 10, &schema).is_none());
        }
    }

    mod context_tests {
        use super::*;

        #[test]
        fn test_mid_value_gives_none() {
            let schema = sample_schema();
            assert!(complete("name = \"x", 0, 9, &schema).is_none());
        }

        #[test]
        fn test_cursor_beyond_document_gives_none() {
            let schema = sample_schema();
            assert!(complete("name = 1\n", 5, 0, &schema).is_none());
        }

        #[test]
        fn test_cursor_on_fresh_trailing_line() {
            let schema = sample_schema();
            let text = "[server]\n";
            // Cursor sits on the line after the header, which has no text yet.
            let suggestions = complete(text, 1, 0, &schema).unwrap();
            assert_eq!(suggestions.len(), 3);
        }
    }
}
