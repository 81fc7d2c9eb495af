//! TOML schema Language Server Protocol implementation
//!
//! This library provides LSP support for TOML files governed by JSON
//! Schemas, including:
//! - Syntax and schema validation diagnostics
//! - Schema-driven key and value completion
//! - Debounced re-validation on edit
//! - A cache-clear command and live configuration reload
//!
//! # Library Usage
//!
//! ```ignore
//! use tomlschema_lsp::run_server;
//!
//! // Run the LSP server over stdio
//! run_server().await;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Start the language server (typically called by an editor)
//! tomlschema-lsp
//!
//! # With debug logging
//! RUST_LOG=debug tomlschema-lsp
//! ```

pub mod server;

// Re-export main entry point
pub use server::run_server;
