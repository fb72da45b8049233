//! # reindex-search
//!
//! Full-text index side of the search reindex job, backed by Tantivy.
//!
//! ## Features
//! - Index directory lifecycle (drop and recreate before a run)
//! - Per-type schema derived from the entity mapping
//! - One index per partition: `<index_dir>/<Type>` or `<index_dir>/<Type>.<n>`
//! - Batched staging with per-type commit and a single durable flush
//! - Filesystem (mmap) or in-memory directory providers

pub mod directory;
pub mod document;
pub mod error;
pub mod index;
pub mod schema;
pub mod session;
pub mod stats;

pub use directory::{IndexDirectoryManager, PreparedDirectory};
pub use document::record_to_doc;
pub use error::{DirectoryError, SearchError};
pub use index::{partition_name, DirectoryProvider, SearchIndexConfig};
pub use schema::{build_record_schema, RecordSchema};
pub use session::{BatchHandle, IndexBackend, IndexSession, TantivyBackend, TantivySession};
pub use stats::{index_stats, PartitionStats};
