//! Error types for the importer binary.

use rallypoint_db::DbError;

/// Errors that can occur while running an import.
#[derive(Debug, thiserror::Error)]
pub enum ImporterError {
    /// A configuration error (missing or malformed environment variable).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document file could not be read.
    #[error("failed to read document file {path}: {source}")]
    ReadFile {
        /// The path that was being read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document file could not be parsed.
    #[error("failed to parse document file {path}: {source}")]
    ParseFile {
        /// The path that was being parsed.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The data layer rejected the import.
    #[error(transparent)]
    Db(#[from] DbError),
}
