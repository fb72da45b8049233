//! Entity catalog: the record types a run must index.

use std::collections::HashSet;

use tracing::{debug, warn};

use reindex_types::RecordType;

use crate::metadata::StoreMetadata;

/// Ordered, deduplicated list of indexable record types.
///
/// Order follows the supplied metadata; nothing downstream should read
/// meaning into it.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    types: Vec<RecordType>,
}

impl EntityCatalog {
    /// Select the types explicitly marked searchable. No I/O.
    pub fn discover(metadata: &StoreMetadata) -> Self {
        let mut seen = HashSet::new();
        let mut types = Vec::new();

        for (name, entity) in metadata.iter() {
            if !entity.searchable {
                debug!(record_type = name, "Not a search target");
                continue;
            }
            if !seen.insert(name.to_string()) {
                warn!(record_type = name, "Duplicate entity mapping ignored");
                continue;
            }
            types.push(RecordType::new(entity.clone()));
        }

        debug!(count = types.len(), "Discovered indexable types");
        Self { types }
    }

    pub fn types(&self) -> &[RecordType] {
        &self.types
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(RecordType::name).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
