//! Schema load, compile, and cache subsystem
//!
//! A schema is useful in two forms at once: the raw JSON tree (for
//! completion traversal) and the compiled validator (for validation). The
//! store produces both in one load and caches them as a single record so
//! the two representations can never drift apart.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::LoadError;

/// Timeout applied to remote schema fetches
const REMOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A loaded schema: raw JSON for traversal, compiled validator for checks.
///
/// The two representations enter and leave the cache together.
#[derive(Clone)]
pub struct SchemaRecord {
    /// The URI the schema was requested under (also the cache key)
    pub uri: String,
    /// Parsed schema JSON
    pub raw: Value,
    /// Compiled validator
    pub compiled: Arc<Validator>,
}

impl std::fmt::Debug for SchemaRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRecord").field("uri", &self.uri).finish()
    }
}

/// Insertion-ordered, bounded schema cache.
///
/// Eviction is oldest-inserted first. Re-inserting an existing URI replaces
/// the record without refreshing its position. A `max_size` of zero disables
/// caching entirely: nothing is ever retained.
#[derive(Debug)]
pub struct SchemaCache {
    records: HashMap<String, SchemaRecord>,
    order: VecDeque<String>,
    max_size: usize,
}

impl SchemaCache {
    /// Create an empty cache bounded at `max_size` entries
    pub fn new(max_size: usize) -> Self {
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Current size bound
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by URI
    pub fn get(&self, uri: &str) -> Option<&SchemaRecord> {
        self.records.get(uri)
    }

    /// Check whether a URI is cached
    pub fn contains(&self, uri: &str) -> bool {
        self.records.contains_key(uri)
    }

    /// Insert a record, evicting the oldest entry when at capacity.
    ///
    /// Returns the evicted URI, if any. No-op when caching is disabled.
    pub fn insert(&mut self, record: SchemaRecord) -> Option<String> {
        if self.max_size == 0 {
            return None;
        }
        if self.records.contains_key(&record.uri) {
            // Replace in place; insertion order is deliberately not refreshed.
            self.records.insert(record.uri.clone(), record);
            return None;
        }

        let evicted = if self.records.len() >= self.max_size {
            self.evict_oldest()
        } else {
            None
        };
        self.order.push_back(record.uri.clone());
        self.records.insert(record.uri.clone(), record);
        evicted
    }

    /// Drop every cached record
    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    /// Change the size bound, evicting oldest-first down to the new bound.
    ///
    /// Returns the URIs that were evicted.
    pub fn resize(&mut self, max_size: usize) -> Vec<String> {
        self.max_size = max_size;
        if max_size == 0 {
            let dropped: Vec<String> = self.order.drain(..).collect();
            self.records.clear();
            return dropped;
        }

        let mut evicted = Vec::new();
        while self.records.len() > self.max_size {
            match self.evict_oldest() {
                Some(uri) => evicted.push(uri),
                None => break,
            }
        }
        evicted
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self.order.pop_front()?;
        self.records.remove(&oldest);
        Some(oldest)
    }
}

/// Loads schemas by URI and serves them from the bounded cache.
///
/// Remote (`http(s)://`) URIs are fetched over the network with a timeout;
/// everything else is a filesystem path, with relative paths resolved
/// against the referring document's directory and falling back to the
/// workspace root.
pub struct SchemaStore {
    cache: SchemaCache,
    http: reqwest::Client,
    workspace_root: Option<PathBuf>,
    loads: u64,
}

impl SchemaStore {
    /// Create a store with the given cache bound
    pub fn new(max_cache_size: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REMOTE_FETCH_TIMEOUT)
            .build()
            .expect("default HTTP client");
        Self {
            cache: SchemaCache::new(max_cache_size),
            http,
            workspace_root: None,
            loads: 0,
        }
    }

    /// Set the fallback base for relative schema paths
    pub fn set_workspace_root(&mut self, root: Option<PathBuf>) {
        self.workspace_root = root;
    }

    /// Number of loads performed; cache hits do not count
    pub fn load_count(&self) -> u64 {
        self.loads
    }

    /// Access the underlying cache
    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Empty the cache (raw and compiled together)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        info!("schema cache cleared");
    }

    /// Apply a new cache bound, evicting as needed
    pub fn resize_cache(&mut self, max_size: usize) {
        for uri in self.cache.resize(max_size) {
            debug!("cache resize evicted schema: {uri}");
        }
    }

    /// Resolve a schema URI to its loaded record.
    ///
    /// Cache hits return without I/O. On a miss the schema is fetched,
    /// parsed, compiled, and (when caching is enabled) inserted with
    /// oldest-first eviction.
    pub async fn resolve(
        &mut self,
        uri: &str,
        document_path: Option<&Path>,
    ) -> Result<SchemaRecord, LoadError> {
        if let Some(record) = self.cache.get(uri) {
            debug!("schema cache hit: {uri}");
            return Ok(record.clone());
        }

        self.loads += 1;
        let content = self.fetch(uri, document_path).await?;
        let raw: Value = serde_json::from_str(&content).map_err(|source| LoadError::Parse {
            uri: uri.to_string(),
            source,
        })?;
        let compiled = jsonschema::validator_for(&raw).map_err(|error| LoadError::Compile {
            uri: uri.to_string(),
            reason: error.to_string(),
        })?;

        let record = SchemaRecord {
            uri: uri.to_string(),
            raw,
            compiled: Arc::new(compiled),
        };
        if let Some(evicted) = self.cache.insert(record.clone()) {
            debug!("cache full, evicted schema: {evicted}");
        }
        debug!("schema loaded: {uri} (cache size {})", self.cache.len());
        Ok(record)
    }

    async fn fetch(&self, uri: &str, document_path: Option<&Path>) -> Result<String, LoadError> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            debug!("fetching remote schema: {uri}");
            let response = self
                .http
                .get(uri)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|error| LoadError::Fetch {
                    uri: uri.to_string(),
                    reason: error.to_string(),
                })?;
            response.text().await.map_err(|error| LoadError::Fetch {
                uri: uri.to_string(),
                reason: error.to_string(),
            })
        } else {
            let path = self.resolve_local(uri, document_path)?;
            debug!("reading local schema: {}", path.display());
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| LoadError::Read {
                    path: path.display().to_string(),
                    source,
                })
        }
    }

    fn resolve_local(
        &self,
        uri: &str,
        document_path: Option<&Path>,
    ) -> Result<PathBuf, LoadError> {
        let candidate = Path::new(uri);
        if candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }

        let base = document_path
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .or_else(|| self.workspace_root.clone());
        match base {
            Some(base) => Ok(base.join(candidate)),
            None => Err(LoadError::UnresolvableRelativePath(uri.to_string())),
        }
    }
}
