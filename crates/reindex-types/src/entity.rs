//! Store-side metadata for one mapped record type.
//!
//! The `searchable` marker is set when the mapping is loaded; nothing is
//! inferred at run time.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Field names used by the index itself.
pub const RESERVED_FIELDS: &[&str] = &["doc_type", "doc_id", "text"];

/// One column (or joined expression) copied into the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Index field name
    pub name: String,

    /// SQL expression selecting the value; the root table is aliased `root`
    pub column: String,

    /// Keep the value retrievable from the index
    #[serde(default = "default_true")]
    pub stored: bool,
}

/// How one record type maps onto physical storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Type name, unique within a mapping
    pub name: String,

    /// Root table; `None` for abstract types with no storage of their own
    #[serde(default)]
    pub table: Option<String>,

    /// Primary key column of the root table
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Explicit search-target marker
    #[serde(default)]
    pub searchable: bool,

    /// Indexed fields
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldMapping>,

    /// Join clauses appended after the root table
    #[serde(default)]
    pub joins: Vec<String>,

    /// Predicate on the root table selecting live rows
    #[serde(default)]
    pub live_filter: Option<String>,

    /// Number of physical index partitions
    #[serde(default = "default_shards")]
    pub shards: u32,
}

fn default_true() -> bool {
    true
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_shards() -> u32 {
    1
}

impl EntityMetadata {
    /// Create metadata for a plain table-backed type.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
            id_column: default_id_column(),
            searchable: false,
            fields: Vec::new(),
            joins: Vec::new(),
            live_filter: None,
            shards: default_shards(),
        }
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldMapping {
            name: name.into(),
            column: column.into(),
            stored: true,
        });
        self
    }

    pub fn with_join(mut self, join: impl Into<String>) -> Self {
        self.joins.push(join.into());
        self
    }

    pub fn with_live_filter(mut self, filter: impl Into<String>) -> Self {
        self.live_filter = Some(filter.into());
        self
    }

    pub fn with_shards(mut self, shards: u32) -> Self {
        self.shards = shards;
        self
    }

    /// Whether the type has storage a query can be built against.
    pub fn is_abstract(&self) -> bool {
        self.table.as_deref().map(str::trim).unwrap_or("").is_empty()
    }

    /// Check the metadata is internally consistent.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.name.trim().is_empty() {
            return Err(TypesError::Mapping("entity name must not be empty".into()));
        }
        // The name doubles as the partition directory name.
        if self.name.starts_with('.') || self.name.contains(['/', '\\']) {
            return Err(TypesError::Mapping(format!(
                "{}: entity name must be a plain directory name",
                self.name
            )));
        }
        if self.shards == 0 {
            return Err(TypesError::Mapping(format!(
                "{}: shards must be >= 1",
                self.name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if RESERVED_FIELDS.contains(&field.name.as_str()) {
                return Err(TypesError::Mapping(format!(
                    "{}: field name '{}' is reserved",
                    self.name, field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(TypesError::Mapping(format!(
                    "{}: duplicate field '{}'",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let meta = EntityMetadata::new("Customer", "customers");
        assert_eq!(meta.id_column, "id");
        assert_eq!(meta.shards, 1);
        assert!(!meta.searchable);
        assert!(!meta.is_abstract());
    }

    #[test]
    fn test_abstract_without_table() {
        let mut meta = EntityMetadata::new("Party", "");
        assert!(meta.is_abstract());
        meta.table = None;
        assert!(meta.is_abstract());
    }

    #[test]
    fn test_validate_reserved_field() {
        let meta = EntityMetadata::new("Customer", "customers").with_field("doc_id", "root.id");
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_field() {
        let meta = EntityMetadata::new("Customer", "customers")
            .with_field("name", "root.name")
            .with_field("name", "root.display_name");
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_validate_name_is_plain() {
        assert!(EntityMetadata::new("../etc", "t").validate().is_err());
        assert!(EntityMetadata::new("a/b", "t").validate().is_err());
        assert!(EntityMetadata::new("Customer", "t").validate().is_ok());
    }

    #[test]
    fn test_validate_zero_shards() {
        let meta = EntityMetadata::new("Customer", "customers").with_shards(0);
        assert!(meta.validate().is_err());
    }
}
