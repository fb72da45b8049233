//! Store metadata: the entity mapping file.
//!
//! ```toml
//! [[entity]]
//! name = "Customer"
//! table = "customers"
//! searchable = true
//! live_filter = "root.deleted_at IS NULL"
//! joins = ["LEFT JOIN orders o ON o.customer_id = root.id"]
//!
//! [[entity.field]]
//! name = "name"
//! column = "root.name"
//! ```
//!
//! Entities keep their declaration order.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use reindex_types::EntityMetadata;

use crate::error::StoreError;

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default, rename = "entity")]
    entities: Vec<EntityMetadata>,
}

/// Everything the store knows about mapped types, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StoreMetadata {
    entities: Vec<Arc<EntityMetadata>>,
}

impl StoreMetadata {
    /// Build metadata from already-parsed entities, validating each.
    pub fn new(entities: Vec<EntityMetadata>) -> Result<Self, StoreError> {
        for entity in &entities {
            entity.validate()?;
        }
        Ok(Self {
            entities: entities.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a mapping document.
    pub fn from_toml_str(source: &str) -> Result<Self, StoreError> {
        let file: MappingFile =
            toml::from_str(source).map_err(|e| StoreError::Mapping(e.to_string()))?;
        Self::new(file.entities)
    }

    /// Load the mapping file at `path`.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Mapping(format!("{}: {}", path.display(), e)))?;
        let metadata = Self::from_toml_str(&source)?;
        debug!(path = ?path, entities = metadata.len(), "Loaded store metadata");
        Ok(metadata)
    }

    /// Entities as (name, metadata) in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<EntityMetadata>)> {
        self.entities.iter().map(|e| (e.name.as_str(), e))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EntityMetadata>> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
