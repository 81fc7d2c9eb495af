//! Schema-tree traversal
//!
//! Walks a raw JSON Schema along a dotted TOML key path to find the
//! sub-schema that applies at that location.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tomlschema_core::walker::walk;
//!
//! let schema = json!({ "properties": { "server": { "type": "object" } } });
//! let segments = vec!["server".to_string()];
//! let node = walk(&schema, &segments).unwrap();
//! assert_eq!(node["type"], "object");
//! ```

use serde_json::Value;

/// Walk `root` along `segments`, returning the applicable sub-schema.
///
/// Each segment descends through `properties`, then (for objects) the first
/// declared `patternProperties` schema, then (for arrays) `items`. Local
/// `#/$defs/` references are dereferenced one level after each descent.
/// Returns `None` as soon as a segment cannot be resolved — there is no
/// partial result. An empty path returns the root itself.
///
/// `patternProperties` handling is a documented best-effort approximation:
/// the first declared pattern's schema is taken without matching the key
/// against the pattern.
pub fn walk<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        let next = if let Some(child) = node
            .get("properties")
            .and_then(|properties| properties.get(segment.as_str()))
        {
            Some(child)
        } else if type_of(node) == Some("object") {
            node.get("patternProperties")
                .and_then(Value::as_object)
                .and_then(|patterns| patterns.values().next())
        } else if type_of(node) == Some("array") {
            node.get("items")
        } else {
            None
        };

        node = match next {
            Some(next) => deref(root, next),
            None => return None,
        };
    }
    Some(node)
}

/// For array nodes, the (dereferenced) element schema; otherwise the node.
///
/// TOML array-of-tables entries are completed against their item schema.
pub fn item_schema<'a>(root: &'a Value, node: &'a Value) -> &'a Value {
    if type_of(node) == Some("array") {
        if let Some(items) = node.get("items") {
            return deref(root, items);
        }
    }
    node
}

fn type_of(node: &Value) -> Option<&str> {
    node.get("type").and_then(Value::as_str)
}

/// Dereference a local `#/$defs/<name>` reference, one level only.
///
/// Remote references and nested dereference chains are out of scope; a
/// reference that does not resolve leaves the node unchanged.
fn deref<'a>(root: &'a Value, node: &'a Value) -> &'a Value {
    let Some(target) = node.get("$ref").and_then(Value::as_str) else {
        return node;
    };
    let Some(name) = target.strip_prefix("#/$defs/") else {
        return node;
    };
    root.get("$defs")
        .and_then(|defs| defs.get(name))
        .unwrap_or(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segments(path: &[&str]) -> Vec<String> {
        path.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_path_returns_root() {
        let schema = json!({ "type": "object", "properties": {} });
        let node = walk(&schema, &[]).unwrap();
        assert_eq!(node, &schema);
    }

    #[test]
    fn test_properties_descent() {
        let schema = json!({
            "properties": {
                "server": {
                    "properties": {
                        "port": { "type": "integer" }
                    }
                }
            }
        });

        let node = walk(&schema, &segments(&["server", "port"])).unwrap();
        assert_eq!(node["type"], "integer");
    }

    #[test]
    fn test_unresolvable_segment_returns_none() {
        let schema = json!({
            "properties": {
                "server": { "type": "object" }
            }
        });

        assert!(walk(&schema, &segments(&["client"])).is_none());
        assert!(walk(&schema, &segments(&["server", "port"])).is_none());
    }

    #[test]
    fn test_pattern_properties_first_declared() {
        let schema = json!({
            "properties": {
                "env": {
                    "type": "object",
                    "patternProperties": {
                        "^APP_": { "type": "string" },
                        "^SYS_": { "type": "integer" }
                    }
                }
            }
        });

        let node = walk(&schema, &segments(&["env", "APP_NAME"])).unwrap();
        assert_eq!(node["type"], "string");
    }

    #[test]
    fn test_empty_pattern_properties_returns_none() {
        let schema = json!({
            "properties": {
                "env": { "type": "object", "patternProperties": {} }
            }
        });

        assert!(walk(&schema, &segments(&["env", "anything"])).is_none());
    }

    #[test]
    fn test_array_segment_descends_into_items() {
        let schema = json!({
            "properties": {
                "fruit": {
                    "type": "array",
                    "items": {
                        "properties": { "name": { "type": "string" } }
                    }
                }
            }
        });

        let node = walk(&schema, &segments(&["fruit", "anything"])).unwrap();
        assert!(node.get("properties").is_some());
    }

    #[test]
    fn test_ref_dereferenced_after_descent() {
        let schema = json!({
            "$defs": {
                "endpoint": {
                    "properties": { "url": { "type": "string" } }
                }
            },
            "properties": {
                "upstream": { "$ref": "#/$defs/endpoint" }
            }
        });

        let node = walk(&schema, &segments(&["upstream"])).unwrap();
        assert!(node.get("properties").is_some());

        let url = walk(&schema, &segments(&["upstream", "url"])).unwrap();
        assert_eq!(url["type"], "string");
    }

    #[test]
    fn test_unresolvable_ref_left_alone() {
        let schema = json!({
            "properties": {
                "upstream": { "$ref": "#/$defs/missing" }
            }
        });

        let node = walk(&schema, &segments(&["upstream"])).unwrap();
        assert_eq!(node["$ref"], "#/$defs/missing");
    }

    #[test]
    fn test_item_schema_unwraps_arrays() {
        let schema = json!({
            "$defs": {
                "fruit": { "properties": { "name": { "type": "string" } } }
            },
            "properties": {
                "fruit": { "type": "array", "items": { "$ref": "#/$defs/fruit" } }
            }
        });

        let array_node = walk(&schema, &segments(&["fruit"])).unwrap();
        let element = item_schema(&schema, array_node);
        assert!(element.get("properties").is_some());
    }

    #[test]
    fn test_item_schema_passthrough_for_non_arrays() {
        let schema = json!({ "type": "object" });
        assert_eq!(item_schema(&schema, &schema), &schema);
    }
}
