//! Store layer error types.

use reindex_types::TypesError;
use thiserror::Error;

/// Errors that can occur in the store layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite operation failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Driver identifier does not name a known driver
    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// Dialect hint cannot be served by the driver
    #[error("Dialect '{dialect}' is not supported by driver '{driver}'")]
    DialectMismatch { driver: String, dialect: String },

    /// Connection could not be opened
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Type has no storage a query can be built against
    #[error("Type '{0}' cannot be mapped to a query")]
    Unmappable(String),

    /// Mapping file missing, unreadable or inconsistent
    #[error("Mapping error: {0}")]
    Mapping(String),
}

impl From<TypesError> for StoreError {
    fn from(err: TypesError) -> Self {
        StoreError::Mapping(err.to_string())
    }
}
