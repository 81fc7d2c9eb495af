//! Schema association for TOML documents
//!
//! Maps a document to the schema URI that governs it. An inline
//! `# $schema:` directive near the top of the file wins unconditionally;
//! otherwise the configured glob associations are tried in order against
//! the document's absolute path.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::Association;

/// Number of leading lines scanned for an inline `# $schema:` directive
pub const DIRECTIVE_SCAN_LINES: usize = 10;

fn directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\s*\$schema:\s*(\S+)").unwrap())
}

/// An inline schema directive found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The schema URI named by the directive
    pub uri: String,
    /// Line the directive appears on (0-indexed)
    pub line: u32,
    /// Column where the directive comment starts (0-indexed)
    pub start: u32,
    /// Length of the directive line, used to span diagnostics over it
    pub end: u32,
}

/// Scan the first [`DIRECTIVE_SCAN_LINES`] lines for a `# $schema:` directive.
pub fn find_directive(text: &str) -> Option<Directive> {
    for (idx, line) in text.lines().take(DIRECTIVE_SCAN_LINES).enumerate() {
        if let Some(caps) = directive_regex().captures(line) {
            if let (Some(whole), Some(uri)) = (caps.get(0), caps.get(1)) {
                return Some(Directive {
                    uri: uri.as_str().to_string(),
                    line: idx as u32,
                    start: whole.start() as u32,
                    end: line.len() as u32,
                });
            }
        }
    }
    None
}

/// Determine the schema URI governing a document, if any.
///
/// Priority: inline directive first, then the first association whose glob
/// fully matches the document's absolute path. Malformed glob patterns are
/// logged and skipped.
pub fn locate(
    text: &str,
    document_path: Option<&Path>,
    associations: &[Association],
) -> Option<String> {
    if let Some(directive) = find_directive(text) {
        debug!("inline $schema directive found: {}", directive.uri);
        return Some(directive.uri);
    }

    let document_path = document_path?;
    let path_str = document_path.to_string_lossy();
    for association in associations {
        let regex = match glob_to_regex(&association.pattern) {
            Ok(regex) => regex,
            Err(error) => {
                warn!(
                    "invalid glob pattern {:?} in schema associations: {error}",
                    association.pattern
                );
                continue;
            }
        };
        if regex.is_match(&path_str) {
            debug!(
                "association {:?} matched {path_str}: {}",
                association.pattern, association.schema
            );
            return Some(association.schema.clone());
        }
    }

    None
}

/// Compile a minimal glob pattern into an anchored regex.
///
/// `**` matches any path segment sequence (separators included), `*` matches
/// any run of non-separator characters; everything else is literal.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern);
    let translated = escaped.replace(r"\*\*", ".*").replace(r"\*", r"[^/\\]*");
    Regex::new(&format!("^{translated}$"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn association(pattern: &str, schema: &str) -> Association {
        Association {
            pattern: pattern.to_string(),
            schema: schema.to_string(),
        }
    }

    mod directive_tests {
        use super::*;

        #[test]
        fn test_directive_found() {
            let text = "# $schema: ./config.schema.json\nname = \"x\"\n";
            let directive = find_directive(text).unwrap();
            assert_eq!(directive.uri, "./config.schema.json");
            assert_eq!(directive.line, 0);
            assert_eq!(directive.start, 0);
            assert_eq!(directive.end, 31);
        }

        #[test]
        fn test_directive_with_loose_spacing() {
            let text = "#$schema:https://example.com/s.json\n";
            let directive = find_directive(text).unwrap();
            assert_eq!(directive.uri, "https://example.com/s.json");
        }

        #[test]
        fn test_directive_not_on_first_line() {
            let text = "name = \"x\"\n# $schema: ./s.json\n";
            let directive = find_directive(text).unwrap();
            assert_eq!(directive.line, 1);
        }

        #[test]
        fn test_directive_beyond_scan_window_ignored() {
            let mut text = String::new();
            for i in 0..DIRECTIVE_SCAN_LINES {
                text.push_str(&format!("key{i} = {i}\n"));
            }
            text.push_str("# $schema: ./late.json\n");
            assert!(find_directive(&text).is_none());
        }
    }

    mod glob_tests {
        use super::*;

        /// `**/config.toml` matches nested and root-level paths, but not
        /// other file names
        #[test]
        fn test_double_star_glob() {
            let regex = glob_to_regex("**/config.toml").unwrap();
            assert!(regex.is_match("/a/b/config.toml"));
            assert!(regex.is_match("/config.toml"));
            assert!(!regex.is_match("/a/config2.toml"));
        }

        #[test]
        fn test_single_star_stays_within_segment() {
            let regex = glob_to_regex("/etc/*.toml").unwrap();
            assert!(regex.is_match("/etc/app.toml"));
            assert!(!regex.is_match("/etc/conf.d/app.toml"));
        }

        #[test]
        fn test_literal_metacharacters_escaped() {
            let regex = glob_to_regex("/data/a+b/config.toml").unwrap();
            assert!(regex.is_match("/data/a+b/config.toml"));
            assert!(!regex.is_match("/data/aab/config.toml"));
        }

        #[test]
        fn test_full_match_required() {
            let regex = glob_to_regex("**/Cargo.toml").unwrap();
            assert!(!regex.is_match("/x/Cargo.toml.bak"));
        }
    }

    mod locate_tests {
        use super::*;

        #[test]
        fn test_directive_wins_over_associations() {
            let text = "# $schema: ./inline.json\n";
            let path = PathBuf::from("/project/config.toml");
            let associations = vec![association("**/config.toml", "./associated.json")];

            let uri = locate(text, Some(&path), &associations);
            assert_eq!(uri.as_deref(), Some("./inline.json"));
        }

        #[test]
        fn test_first_matching_association_wins() {
            let text = "name = \"x\"\n";
            let path = PathBuf::from("/project/config.toml");
            let associations = vec![
                association("**/other.toml", "./other.json"),
                association("**/config.toml", "./first.json"),
                association("**/*.toml", "./fallback.json"),
            ];

            let uri = locate(text, Some(&path), &associations);
            assert_eq!(uri.as_deref(), Some("./first.json"));
        }

        #[test]
        fn test_no_match_returns_none() {
            let text = "name = \"x\"\n";
            let path = PathBuf::from("/project/config.toml");
            let associations = vec![association("**/pyproject.toml", "./py.json")];

            assert!(locate(text, Some(&path), &associations).is_none());
        }

        #[test]
        fn test_associations_need_a_document_path() {
            let text = "name = \"x\"\n";
            let associations = vec![association("**/*.toml", "./fallback.json")];

            assert!(locate(text, None, &associations).is_none());
        }
    }
}
