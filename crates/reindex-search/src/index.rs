//! Tantivy index management.
//!
//! Handles partition naming, directory providers, and opening or creating
//! the index behind each partition.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tantivy::{Index, IndexWriter};
use tracing::{debug, info};

use reindex_types::{EntityMetadata, IndexTarget, TargetLocation};

use crate::error::SearchError;
use crate::schema::{build_record_schema, RecordSchema};

/// Default memory budget for IndexWriter (50MB)
const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// Tantivy refuses writer budgets below ~15MB per thread.
const MIN_WRITER_MEMORY_MB: usize = 15;

/// Physical storage strategy for index partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryProvider {
    /// Memory-mapped directory under the index base
    #[default]
    Filesystem,
    /// In-memory index, discarded when the session closes
    Ram,
}

impl DirectoryProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectoryProvider::Filesystem => "filesystem",
            DirectoryProvider::Ram => "ram",
        }
    }
}

impl FromStr for DirectoryProvider {
    type Err = SearchError;

    /// Accepts short names and the legacy provider class names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "filesystem" | "fs" | "mmap" => Ok(DirectoryProvider::Filesystem),
            "ram" | "memory" => Ok(DirectoryProvider::Ram),
            _ if lower.ends_with("fsdirectoryprovider") => Ok(DirectoryProvider::Filesystem),
            _ if lower.ends_with("ramdirectoryprovider") => Ok(DirectoryProvider::Ram),
            _ => Err(SearchError::UnknownProvider(s.to_string())),
        }
    }
}

/// Search index configuration for one run.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Prepared index base directory
    pub index_base: PathBuf,
    /// Directory provider
    pub provider: DirectoryProvider,
    /// Memory budget for each writer in MB
    pub writer_memory_mb: usize,
}

impl SearchIndexConfig {
    pub fn new(index_base: impl Into<PathBuf>) -> Self {
        Self {
            index_base: index_base.into(),
            provider: DirectoryProvider::default(),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    pub fn with_provider(mut self, provider: DirectoryProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }

    /// Where each partition of a type lives. Nothing is opened.
    pub fn targets(&self, entity: &EntityMetadata) -> Vec<IndexTarget> {
        (0..entity.shards.max(1))
            .map(|shard| {
                let name = partition_name(&entity.name, shard, entity.shards);
                let location = match self.provider {
                    DirectoryProvider::Filesystem => {
                        TargetLocation::Directory(self.index_base.join(&name))
                    }
                    DirectoryProvider::Ram => TargetLocation::Ram(name),
                };
                IndexTarget {
                    record_type: entity.name.clone(),
                    shard,
                    location,
                }
            })
            .collect()
    }

    /// Open (or create) the index behind a target.
    pub fn open_partition(
        &self,
        entity: &EntityMetadata,
        target: &IndexTarget,
    ) -> Result<(Index, RecordSchema), SearchError> {
        match &target.location {
            TargetLocation::Directory(path) => {
                if !self.index_base.is_dir() {
                    return Err(SearchError::DirectoryMissing(self.index_base.clone()));
                }
                open_or_create_index(path, entity)
            }
            TargetLocation::Ram(name) => {
                debug!(partition = %name, "Creating in-memory index");
                let schema = build_record_schema(entity);
                let index = Index::create_in_ram(schema.schema().clone());
                Ok((index, schema))
            }
        }
    }

    /// Create a single-threaded writer with the configured memory budget.
    pub fn writer(&self, index: &Index) -> Result<IndexWriter, SearchError> {
        let memory_mb = self.writer_memory_mb.max(MIN_WRITER_MEMORY_MB);
        let writer = index.writer_with_num_threads(1, memory_mb * 1024 * 1024)?;
        debug!(memory_mb, "Created index writer");
        Ok(writer)
    }
}

/// Directory name of one partition: `Type` when unsharded, else `Type.<n>`.
pub fn partition_name(record_type: &str, shard: u32, shards: u32) -> String {
    if shards <= 1 {
        record_type.to_string()
    } else {
        format!("{}.{}", record_type, shard)
    }
}

/// Open an existing index or create a new one.
///
/// An existing index must match the mapping's fields.
pub fn open_or_create_index(
    path: &Path,
    entity: &EntityMetadata,
) -> Result<(Index, RecordSchema), SearchError> {
    if path.join("meta.json").exists() {
        debug!(path = ?path, "Opening existing index");
        let index = Index::open_in_dir(path)?;
        let schema = RecordSchema::from_schema(index.schema(), entity)?;
        Ok((index, schema))
    } else {
        info!(path = ?path, "Creating new index");
        std::fs::create_dir_all(path)?;
        let schema = build_record_schema(entity);
        let index = Index::create_in_dir(path, schema.schema().clone())?;
        Ok((index, schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn customer() -> EntityMetadata {
        EntityMetadata::new("Customer", "customers").with_field("name", "root.name")
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(
            "filesystem".parse::<DirectoryProvider>().unwrap(),
            DirectoryProvider::Filesystem
        );
        assert_eq!(
            "org.hibernate.search.store.RAMDirectoryProvider"
                .parse::<DirectoryProvider>()
                .unwrap(),
            DirectoryProvider::Ram
        );
        assert!("s3".parse::<DirectoryProvider>().is_err());
    }

    #[test]
    fn test_partition_names() {
        assert_eq!(partition_name("Customer", 0, 1), "Customer");
        assert_eq!(partition_name("Customer", 2, 3), "Customer.2");
    }

    #[test]
    fn test_targets_for_sharded_type() {
        let config = SearchIndexConfig::new("/idx");
        let targets = config.targets(&customer().with_shards(2));
        assert_eq!(targets.len(), 2);
        assert_eq!(
            targets[1].location,
            TargetLocation::Directory(PathBuf::from("/idx/Customer.1"))
        );
    }

    #[test]
    fn test_targets_in_ram() {
        let config = SearchIndexConfig::new("/idx").with_provider(DirectoryProvider::Ram);
        let targets = config.targets(&customer());
        assert_eq!(targets[0].location, TargetLocation::Ram("Customer".into()));
    }

    #[test]
    fn test_create_then_reopen_partition() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchIndexConfig::new(temp_dir.path()).with_memory_mb(15);
        let target = &config.targets(&customer())[0];

        let _ = config.open_partition(&customer(), target).unwrap();
        assert!(temp_dir.path().join("Customer/meta.json").exists());

        let (index, schema) = config.open_partition(&customer(), target).unwrap();
        assert!(schema.field("name").is_some());
        let _writer = config.writer(&index).unwrap();
    }

    #[test]
    fn test_reopen_with_changed_mapping_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchIndexConfig::new(temp_dir.path());
        let target = &config.targets(&customer())[0];
        let _ = config.open_partition(&customer(), target).unwrap();

        let changed = customer().with_field("email", "root.email");
        let result = config.open_partition(&changed, target);
        assert!(matches!(result, Err(SearchError::SchemaMismatch(_))));
    }

    #[test]
    fn test_missing_base_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchIndexConfig::new(temp_dir.path().join("not-prepared"));
        let target = &config.targets(&customer())[0];

        let result = config.open_partition(&customer(), target);
        assert!(matches!(result, Err(SearchError::DirectoryMissing(_))));
    }

    #[test]
    fn test_config_with_memory() {
        let config = SearchIndexConfig::new("/tmp/test").with_memory_mb(100);
        assert_eq!(config.writer_memory_mb, 100);
        assert_eq!(config.provider, DirectoryProvider::Filesystem);
    }
}
