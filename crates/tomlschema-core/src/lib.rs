//! Core engine for schema-aware TOML tooling
//!
//! This library maps TOML documents to externally-declared JSON Schemas and
//! derives editor feedback from them:
//! - Schema association via inline `# $schema:` directives or glob rules
//! - Schema loading, compilation, and bounded caching (raw + compiled pairs)
//! - Schema-tree traversal along dotted TOML key paths
//! - Syntax and schema validation producing positioned diagnostics
//! - Schema-driven key and value completion
//!
//! The library has no editor types of its own; the companion
//! `tomlschema-lsp` crate converts its diagnostics and suggestions into LSP
//! structures.

pub mod complete;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod locator;
pub mod store;
pub mod validate;
pub mod walker;

// Re-export commonly used types
pub use config::{Association, CacheSettings, SchemaSettings, Settings};
pub use diagnostics::{Diagnostic, DiagnosticSource, Severity, Span};
pub use error::LoadError;
pub use store::{SchemaRecord, SchemaStore};
