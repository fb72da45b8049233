//! Error types shared by the reindex crates.

use thiserror::Error;

/// Errors raised while resolving configuration or mapping metadata.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mapping file could not be parsed or is inconsistent
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
