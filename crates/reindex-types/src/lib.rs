//! # reindex-types
//!
//! Shared domain types for the search reindex job.
//!
//! - [`Settings`]: layered job configuration
//! - [`EntityMetadata`]: what the store knows about one mapped record type
//! - [`RecordType`], [`RecordInstance`], [`IndexTarget`]: the record model
//!   passed between the store, the index and the pipeline

pub mod config;
pub mod entity;
pub mod error;
pub mod record;

pub use config::{Settings, DEFAULT_DRIVER};
pub use entity::{EntityMetadata, FieldMapping, RESERVED_FIELDS};
pub use error::TypesError;
pub use record::{IndexTarget, RecordInstance, RecordType, TargetLocation};
