//! Error taxonomy for a reindex run.
//!
//! Every fatal condition becomes a single [`ReindexError`]: a kind, a message
//! naming the record type where one applies, and the underlying cause.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use reindex_search::{DirectoryError, SearchError};
use reindex_store::StoreError;
use reindex_types::TypesError;

/// Classification of a run failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Settings or mapping could not be resolved
    Config,
    /// Index directory could not be dropped or created
    Directory,
    /// Store connection or index session could not be opened
    Connect,
    /// Store read failed for a type
    Read,
    /// Index rejected a record
    Stage,
    /// Index rejected a batch
    Commit,
    /// Committed batches could not be made durable
    Flush,
    /// Run was interrupted
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Directory => "directory",
            ErrorKind::Connect => "connect",
            ErrorKind::Read => "read",
            ErrorKind::Stage => "stage",
            ErrorKind::Commit => "commit",
            ErrorKind::Flush => "flush",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying error from one of the layers a run drives.
#[derive(Debug, Error)]
pub enum Cause {
    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// The first fatal error of a run.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct ReindexError {
    kind: ErrorKind,
    record_type: Option<String>,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl ReindexError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            record_type: None,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the record type being processed.
    pub fn for_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn config(cause: impl Into<Cause>) -> Self {
        Self::new(ErrorKind::Config, "invalid configuration").with_cause(cause)
    }

    pub fn directory(cause: DirectoryError) -> Self {
        Self::new(ErrorKind::Directory, "preparing the index directory failed").with_cause(cause)
    }

    pub fn connect(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::new(ErrorKind::Connect, message).with_cause(cause)
    }

    pub fn read(record_type: &str, cause: StoreError) -> Self {
        Self::new(ErrorKind::Read, format!("reading {} failed", record_type))
            .for_type(record_type)
            .with_cause(cause)
    }

    pub fn stage(record_type: &str, cause: SearchError) -> Self {
        Self::new(ErrorKind::Stage, format!("staging {} failed", record_type))
            .for_type(record_type)
            .with_cause(cause)
    }

    pub fn commit(record_type: &str, cause: SearchError) -> Self {
        Self::new(ErrorKind::Commit, format!("committing {} failed", record_type))
            .for_type(record_type)
            .with_cause(cause)
    }

    pub fn flush(cause: SearchError) -> Self {
        Self::new(ErrorKind::Flush, "flushing the index failed").with_cause(cause)
    }

    pub fn cancelled(record_type: Option<&str>) -> Self {
        let err = Self::new(ErrorKind::Cancelled, "run cancelled");
        match record_type {
            Some(name) => err.for_type(name),
            None => err,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn record_type(&self) -> Option<&str> {
        self.record_type.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }
}

impl Serialize for ReindexError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ReindexError", 4)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("record_type", &self.record_type)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("cause", &self.cause.as_ref().map(|c| c.to_string()))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = ReindexError::read("Order", StoreError::Unmappable("Order".into()));
        assert_eq!(err.to_string(), "read error: reading Order failed");
        assert_eq!(err.kind(), ErrorKind::Read);
        assert_eq!(err.record_type(), Some("Order"));
    }

    #[test]
    fn test_cause_is_source() {
        let err = ReindexError::flush(SearchError::SchemaMismatch("Customer".into()));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Schema mismatch: Customer");
    }

    #[test]
    fn test_serialize() {
        let err = ReindexError::cancelled(Some("Customer"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "cancelled");
        assert_eq!(json["record_type"], "Customer");
        assert!(json["cause"].is_null());
    }
}
