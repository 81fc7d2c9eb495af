//! LSP front-end for the schema validation and completion core
//!
//! Wires document lifecycle events into validation passes and exposes
//! schema-driven completion. All state lives on the backend; nothing is
//! ambient.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionOptions, CompletionParams,
    CompletionResponse, Diagnostic, DiagnosticSeverity, DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, Documentation, ExecuteCommandOptions, ExecuteCommandParams,
    InitializeParams, InitializeResult, InitializedParams, MarkupContent, MarkupKind,
    MessageType, Position, Range, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, Url, WorkDoneProgressOptions,
};
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

use tomlschema_core::complete::{self, Suggestion, SuggestionKind};
use tomlschema_core::config::Settings;
use tomlschema_core::diagnostics::{Diagnostic as CoreDiagnostic, Severity};
use tomlschema_core::locator;
use tomlschema_core::store::SchemaStore;
use tomlschema_core::validate;

/// Delay between the last edit and the re-validation it triggers
const CHANGE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Command that empties the schema cache and re-validates open documents
pub const CLEAR_SCHEMA_CACHE_COMMAND: &str = "toml.clearSchemaCache";

/// Workspace configuration file consulted when the client sends no settings
const SETTINGS_FILE: &str = "tomlschema.toml";

/// LSP Backend state
pub struct Backend {
    /// LSP client for publishing diagnostics and notifications
    client: Client,
    /// Active configuration
    settings: Arc<RwLock<Settings>>,
    /// Schema loader and bounded cache
    store: Arc<RwLock<SchemaStore>>,
    /// Document store for open documents
    documents: Arc<RwLock<HashMap<Url, String>>>,
    /// Per-document validation generations; a bump invalidates pending passes
    generations: Arc<RwLock<HashMap<Url, u64>>>,
}

impl Backend {
    /// Create a new backend instance
    pub fn new(client: Client) -> Self {
        let settings = Settings::default();
        let store = SchemaStore::new(settings.schema.cache.max_size);
        Self {
            client,
            settings: Arc::new(RwLock::new(settings)),
            store: Arc::new(RwLock::new(store)),
            documents: Arc::new(RwLock::new(HashMap::new())),
            generations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get document text by URI
    async fn get_document(&self, uri: &Url) -> Option<String> {
        let docs = self.documents.read().await;
        docs.get(uri).cloned()
    }

    /// Store document text
    async fn store_document(&self, uri: Url, text: String) {
        let mut docs = self.documents.write().await;
        docs.insert(uri, text);
    }

    /// Remove document from store
    async fn remove_document(&self, uri: &Url) {
        let mut docs = self.documents.write().await;
        docs.remove(uri);
    }

    /// Start a new validation generation for a document.
    ///
    /// Pending passes holding an older generation discard their results.
    async fn bump_generation(&self, uri: &Url) -> u64 {
        let mut generations = self.generations.write().await;
        let entry = generations.entry(uri.clone()).or_insert(0);
        *entry = entry.wrapping_add(1);
        *entry
    }

    /// Validate a document now and publish diagnostics
    async fn validate(&self, uri: Url, text: String) {
        let generation = self.bump_generation(&uri).await;
        debug!("validating document: {uri}");

        let diagnostics = compute_diagnostics(&self.settings, &self.store, &uri, &text).await;
        if !is_current(&self.generations, &uri, generation).await {
            debug!("discarding stale validation results for {uri}");
            return;
        }

        debug!("publishing {} diagnostics for {uri}", diagnostics.len());
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    /// Schedule a debounced validation pass.
    ///
    /// Only the last edit in a burst runs a pass; the generation is
    /// re-checked after the pass so a slow schema fetch cannot publish
    /// results for text that has since changed.
    async fn schedule_validation(&self, uri: Url, text: String) {
        let generation = self.bump_generation(&uri).await;
        let client = self.client.clone();
        let settings = self.settings.clone();
        let store = self.store.clone();
        let generations = self.generations.clone();

        tokio::spawn(async move {
            sleep(CHANGE_DEBOUNCE).await;
            if !is_current(&generations, &uri, generation).await {
                return;
            }

            let diagnostics = compute_diagnostics(&settings, &store, &uri, &text).await;
            if !is_current(&generations, &uri, generation).await {
                debug!("discarding stale validation results for {uri}");
                return;
            }

            client.publish_diagnostics(uri, diagnostics, None).await;
        });
    }

    /// Re-validate every open document
    async fn revalidate_all(&self) {
        let snapshot: Vec<(Url, String)> = {
            let docs = self.documents.read().await;
            docs.iter().map(|(uri, text)| (uri.clone(), text.clone())).collect()
        };
        for (uri, text) in snapshot {
            self.validate(uri, text).await;
        }
    }

    /// Install new settings, resizing or clearing the cache as needed
    async fn apply_settings(&self, new: Settings) {
        let associations_changed = {
            let current = self.settings.read().await;
            current.schema.associations != new.schema.associations
        };
        {
            let mut store = self.store.write().await;
            store.resize_cache(new.schema.cache.max_size);
            if associations_changed {
                info!("schema associations changed, clearing cache");
                store.clear_cache();
            }
        }
        *self.settings.write().await = new;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("tomlschema LSP server initializing");

        let root = workspace_root(&params);
        if let Some(settings) = params
            .initialization_options
            .as_ref()
            .and_then(parse_settings)
        {
            self.apply_settings(settings).await;
        } else if let Some(settings) = root.as_deref().and_then(load_settings_file) {
            self.apply_settings(settings).await;
        }
        self.store.write().await.set_workspace_root(root);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                // Schema-driven completion
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![
                        ".".to_string(), // dotted keys and tables
                        "=".to_string(), // value position
                        "\"".to_string(), // quoted keys
                    ]),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                    ..Default::default()
                }),
                // Cache-clear command
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![CLEAR_SCHEMA_CACHE_COMMAND.to_string()],
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "tomlschema-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("tomlschema LSP server initialized");
        self.client
            .log_message(MessageType::INFO, "tomlschema language server ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!("tomlschema LSP server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        debug!("Document opened: {}", params.text_document.uri);
        let uri = params.text_document.uri.clone();
        let text = params.text_document.text.clone();
        self.store_document(uri.clone(), text.clone()).await;
        self.validate(uri, text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        debug!("Document changed: {} (debounced)", params.text_document.uri);
        // Since we use FULL sync, the entire content is in the first change
        if let Some(change) = params.content_changes.into_iter().next() {
            let uri = params.text_document.uri.clone();
            let text = change.text;
            self.store_document(uri.clone(), text.clone()).await;
            self.schedule_validation(uri, text).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        debug!("Document saved: {}", params.text_document.uri);
        let uri = params.text_document.uri.clone();
        let text = match params.text {
            Some(text) => {
                self.store_document(uri.clone(), text.clone()).await;
                Some(text)
            }
            None => self.get_document(&uri).await,
        };
        if let Some(text) = text {
            self.validate(uri, text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        debug!("Document closed: {}", params.text_document.uri);
        let uri = params.text_document.uri;
        // Invalidate any pending debounced pass for this document.
        self.bump_generation(&uri).await;
        self.remove_document(&uri).await;
        // Clear diagnostics for closed document
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        debug!("configuration changed");
        if let Some(settings) = parse_settings(&params.settings) {
            self.apply_settings(settings).await;
        }
        self.revalidate_all().await;
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        if params.command == CLEAR_SCHEMA_CACHE_COMMAND {
            info!("clearing schema cache on client request");
            self.store.write().await.clear_cache();
            self.client
                .log_message(MessageType::INFO, "TOML schema cache cleared")
                .await;
            self.revalidate_all().await;
        } else {
            warn!("unknown command: {}", params.command);
        }
        Ok(None)
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        debug!("Completion request for: {uri}");

        if !self.settings.read().await.schema.enable_completions {
            return Ok(None);
        }
        let Some(text) = self.get_document(&uri).await else {
            warn!("Document not found for completion: {uri}");
            return Ok(None);
        };

        let document_path = uri.to_file_path().ok();
        let schema_uri = {
            let settings = self.settings.read().await;
            locator::locate(&text, document_path.as_deref(), &settings.schema.associations)
        };
        let Some(schema_uri) = schema_uri else {
            debug!("no schema governs {uri}, no completions");
            return Ok(None);
        };

        let record = {
            let mut store = self.store.write().await;
            store.resolve(&schema_uri, document_path.as_deref()).await
        };
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                warn!("schema unavailable for completion: {error}");
                return Ok(None);
            }
        };

        let suggestions = complete::complete(&text, position.line, position.character, &record.raw);
        Ok(suggestions.map(|items| {
            debug!("Generated {} completions for {uri}", items.len());
            CompletionResponse::Array(items.iter().map(to_completion_item).collect())
        }))
    }
}

/// Run one validation pass and convert the findings to LSP diagnostics.
///
/// The store's write guard is held across the pass, so passes serialize:
/// the cache's lookup-evict-insert sequence is never interleaved.
async fn compute_diagnostics(
    settings: &RwLock<Settings>,
    store: &RwLock<SchemaStore>,
    uri: &Url,
    text: &str,
) -> Vec<Diagnostic> {
    let document_path = uri.to_file_path().ok();
    let settings = settings.read().await;
    let mut store = store.write().await;
    validate::validate(text, document_path.as_deref(), &settings.schema, &mut store)
        .await
        .iter()
        .map(to_lsp_diagnostic)
        .collect()
}

/// Check whether `generation` is still the document's latest
async fn is_current(generations: &RwLock<HashMap<Url, u64>>, uri: &Url, generation: u64) -> bool {
    generations.read().await.get(uri).copied().unwrap_or(0) == generation
}

/// Convert a core diagnostic to its LSP form
fn to_lsp_diagnostic(diagnostic: &CoreDiagnostic) -> Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };

    Diagnostic {
        range: Range {
            start: Position::new(diagnostic.span.line, diagnostic.span.start),
            end: Position::new(diagnostic.span.line, diagnostic.span.end),
        },
        severity: Some(severity),
        source: Some(diagnostic.source.as_str().to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}

/// Convert a core suggestion to an LSP completion item
fn to_completion_item(suggestion: &Suggestion) -> CompletionItem {
    let kind = match suggestion.kind {
        SuggestionKind::Property => CompletionItemKind::PROPERTY,
        SuggestionKind::EnumMember => CompletionItemKind::ENUM_MEMBER,
        SuggestionKind::Value => CompletionItemKind::VALUE,
    };

    CompletionItem {
        label: suggestion.label.clone(),
        kind: Some(kind),
        detail: suggestion.detail.clone(),
        documentation: suggestion.documentation.as_ref().map(|docs| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: docs.clone(),
            })
        }),
        insert_text: suggestion.insert_text.clone(),
        ..Default::default()
    }
}

/// Parse settings from a client-provided JSON value.
///
/// Accepts either the bare settings object or one namespaced under `toml`.
fn parse_settings(value: &Value) -> Option<Settings> {
    let section = value.get("toml").unwrap_or(value);
    match serde_json::from_value(section.clone()) {
        Ok(settings) => Some(settings),
        Err(error) => {
            warn!("ignoring malformed settings: {error}");
            None
        }
    }
}

/// First workspace folder, used to anchor relative schema paths
#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    if let Some(folder) = params.workspace_folders.as_ref().and_then(|f| f.first()) {
        if let Ok(path) = folder.uri.to_file_path() {
            return Some(path);
        }
    }
    params.root_uri.as_ref().and_then(|uri| uri.to_file_path().ok())
}

/// Load settings from `tomlschema.toml` at the workspace root, if present
fn load_settings_file(root: &Path) -> Option<Settings> {
    let path = root.join(SETTINGS_FILE);
    let content = std::fs::read_to_string(&path).ok()?;
    match Settings::from_toml_str(&content) {
        Ok(settings) => {
            info!("loaded settings from {}", path.display());
            Some(settings)
        }
        Err(error) => {
            warn!("ignoring malformed {}: {error}", path.display());
            None
        }
    }
}

/// Run the language server over stdio until the client disconnects
pub async fn run_server() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
