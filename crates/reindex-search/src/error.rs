//! Search error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing the index.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Existing index does not match the mapped fields
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A batch is already open
    #[error("Batch already in progress for {0}")]
    BatchInProgress(String),

    /// Handle does not belong to the open batch
    #[error("Unknown batch handle for {0}")]
    UnknownBatch(String),

    /// Unrecognised directory provider name
    #[error("Unknown directory provider: {0}")]
    UnknownProvider(String),

    /// Index base directory has not been prepared
    #[error("Index directory missing: {0}")]
    DirectoryMissing(PathBuf),
}

/// Errors from preparing the index base directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Existing directory could not be removed
    #[error("Failed to remove index directory {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory does not exist after the create attempt
    #[error("Failed to create index directory {path}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },
}
