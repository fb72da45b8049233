//! Read-only statistics for an index base directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tantivy::Index;

use crate::error::SearchError;

/// Document and segment counts for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub name: String,
    pub path: PathBuf,
    pub num_docs: u64,
    pub num_segments: usize,
}

/// Collect stats for every partition under `base`, sorted by name.
///
/// Subdirectories without a `meta.json` are not partitions and are skipped.
pub fn index_stats(base: &Path) -> Result<Vec<PartitionStats>, SearchError> {
    if !base.is_dir() {
        return Err(SearchError::DirectoryMissing(base.to_path_buf()));
    }

    let mut stats = Vec::new();
    for entry in fs::read_dir(base)? {
        let path = entry?.path();
        if !path.join("meta.json").is_file() {
            continue;
        }
        let index = Index::open_in_dir(&path)?;
        let searcher = index.reader()?.searcher();
        stats.push(PartitionStats {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            num_docs: searcher.num_docs(),
            num_segments: searcher.segment_readers().len(),
            path,
        });
    }
    stats.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use reindex_types::{EntityMetadata, RecordInstance, RecordType};
    use tempfile::TempDir;

    use crate::index::SearchIndexConfig;
    use crate::session::{IndexBackend, IndexSession, TantivyBackend};

    #[test]
    fn test_stats_after_flush() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("not-an-index")).unwrap();

        let config = SearchIndexConfig::new(temp_dir.path()).with_memory_mb(15);
        let mut session = TantivyBackend.open_session(&config).unwrap();
        for name in ["Order", "Customer"] {
            let ty = RecordType::new(Arc::new(
                EntityMetadata::new(name, "t").with_field("label", "root.label"),
            ));
            let batch = session.begin_batch(&ty).unwrap();
            session
                .stage(&batch, &RecordInstance::new(name, "1").with_value("label", "x"))
                .unwrap();
            session.commit_batch(batch).unwrap();
        }
        session.flush().unwrap();
        session.close().unwrap();

        let stats = index_stats(temp_dir.path()).unwrap();
        let names: Vec<_> = stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Customer", "Order"]);
        assert!(stats.iter().all(|s| s.num_docs == 1));
    }

    #[test]
    fn test_stats_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = index_stats(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(SearchError::DirectoryMissing(_))));
    }
}
