//! Error types for schema loading

use thiserror::Error;

/// Failure to produce a usable schema from a URI.
///
/// Load errors are reported and swallowed at the store boundary: validation
/// and completion treat them as "schema unavailable" and carry on with
/// whatever they can still do.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Remote fetch failed (network error, timeout, or non-success status).
    #[error("failed to fetch schema {uri}: {reason}")]
    Fetch {
        /// The remote schema URI.
        uri: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// Local schema file could not be read.
    #[error("failed to read schema {path}: {source}")]
    Read {
        /// Resolved filesystem path of the schema.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A relative schema path with nothing to anchor it against.
    #[error("cannot resolve relative schema path \"{0}\" without a document or workspace root")]
    UnresolvableRelativePath(String),

    /// Schema content is not valid JSON.
    #[error("schema {uri} is not valid JSON: {source}")]
    Parse {
        /// The schema URI as requested.
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    /// Schema JSON does not compile into a validator.
    #[error("schema {uri} did not compile: {reason}")]
    Compile {
        /// The schema URI as requested.
        uri: String,
        /// The compiler's own error message.
        reason: String,
    },
}
