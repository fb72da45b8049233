//! Record model shared by the store, the index and the pipeline.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::EntityMetadata;

/// A class of indexable entity, discovered once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    name: String,
    metadata: Arc<EntityMetadata>,
}

impl RecordType {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self {
            name: metadata.name.clone(),
            metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One live root record read from the store.
///
/// Field values are kept in column order. A field may carry several values
/// when joined rows were collapsed into the same root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInstance {
    record_type: String,
    id: String,
    fields: Vec<(String, String)>,
}

impl RecordInstance {
    pub fn new(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a value, ignoring exact duplicates of an existing value.
    pub fn add_value(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        if self.fields.iter().any(|(f, v)| f == field && *v == value) {
            return;
        }
        self.fields.push((field.to_string(), value));
    }

    pub fn with_value(mut self, field: &str, value: impl Into<String>) -> Self {
        self.add_value(field, value);
        self
    }

    /// Fold another row of the same root into this record.
    pub fn merge(&mut self, other: RecordInstance) {
        for (field, value) in other.fields {
            self.add_value(&field, value);
        }
    }

    /// All values of one field.
    pub fn values<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// All (field, value) pairs.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// Where a physical index partition lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLocation {
    Directory(PathBuf),
    Ram(String),
}

impl fmt::Display for TargetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetLocation::Directory(path) => write!(f, "{}", path.display()),
            TargetLocation::Ram(name) => write!(f, "ram://{}", name),
        }
    }
}

/// One physical index partition of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTarget {
    pub record_type: String,
    pub shard: u32,
    pub location: TargetLocation,
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] -> {}", self.record_type, self.shard, self.location)
    }
}
