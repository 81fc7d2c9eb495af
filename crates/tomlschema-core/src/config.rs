//! Configuration surface
//!
//! Settings are consumed, not owned, by the core: the server feeds them in
//! from LSP `initialization_options`, `workspace/didChangeConfiguration`
//! pushes, or a `tomlschema.toml` file at the workspace root:
//!
//! ```toml
//! [schema]
//! enableValidation = true
//! enableCompletions = true
//!
//! [schema.cache]
//! maxSize = 20
//!
//! [[schema.associations]]
//! pattern = "**/config.toml"
//! schema = "./schemas/config.schema.json"
//! ```
//!
//! Key names are camelCase to match the original editor-settings surface.

use serde::{Deserialize, Serialize};

/// Default bound on the schema cache
pub const DEFAULT_CACHE_MAX_SIZE: usize = 20;

/// Top-level settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Schema association, validation, and completion settings
    pub schema: SchemaSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// Schema subsystem configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaSettings {
    /// Validate documents against their associated schema
    pub enable_validation: bool,
    /// Offer schema-driven completions
    pub enable_completions: bool,
    /// Schema cache bounds
    pub cache: CacheSettings,
    /// Glob-pattern associations, matched in order
    pub associations: Vec<Association>,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            enable_validation: true,
            enable_completions: true,
            cache: CacheSettings::default(),
            associations: Vec::new(),
        }
    }
}

/// Schema cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheSettings {
    /// Maximum number of cached schemas; 0 disables caching
    pub max_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CACHE_MAX_SIZE,
        }
    }
}

/// A glob-pattern-to-schema-URI association rule
///
/// Rules are kept as an ordered list rather than a map: the first pattern
/// matching a document's absolute path wins, so declaration order matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Glob pattern matched against the document's absolute path
    pub pattern: String,
    /// Schema URI to use when the pattern matches
    pub schema: String,
}
