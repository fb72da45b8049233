//! Store layer for the search reindex job.
//!
//! Provides:
//! - Store metadata loaded from the entity mapping file
//! - The entity catalog (which types are search targets, in mapping order)
//! - A read-only SQLite connection and the [`RecordSource`] built on it
//!
//! Records are read lazily in keyset-paginated pages and collapsed to one
//! instance per root id, so join fan-out never reaches the index.

pub mod catalog;
pub mod connection;
pub mod error;
pub mod metadata;
pub mod source;

pub use catalog::EntityCatalog;
pub use connection::{redact_url, ConnectionSettings, Driver, SqliteConnector, SqliteTarget};
pub use error::StoreError;
pub use metadata::StoreMetadata;
pub use source::{RecordSource, RecordStream, SqliteRecordSource, StoreConnector};
