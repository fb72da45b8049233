//! Index base directory lifecycle.
//!
//! A run owns its index directory exclusively from `prepare` until cleanup.
//! Nothing here locks against a second process; callers must not start two
//! runs on the same path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::DirectoryError;

/// Result of preparing the index directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDirectory {
    /// Absolute path writers must target
    pub path: PathBuf,
    /// An existing directory was removed first
    pub dropped: bool,
    /// The directory had to be created
    pub created: bool,
}

/// Drops and (re)creates the index base directory.
pub struct IndexDirectoryManager;

impl IndexDirectoryManager {
    /// Make sure `path` exists as an empty-or-reusable directory.
    ///
    /// With `drop_existing`, anything already at `path` is removed first.
    /// Removal is not retried: a half-removed tree must not be reused.
    pub fn prepare(path: &Path, drop_existing: bool) -> Result<PreparedDirectory, DirectoryError> {
        let mut dropped = false;
        if drop_existing && fs::symlink_metadata(path).is_ok() {
            info!(path = ?path, "Dropping index directory");
            let removed = if path.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            removed.map_err(|source| DirectoryError::RemoveFailed {
                path: path.to_path_buf(),
                source,
            })?;
            dropped = true;
        }

        let mut created = false;
        let mut create_error = None;
        if !path.exists() {
            info!(path = ?path, "Creating index directory");
            match fs::create_dir_all(path) {
                Ok(()) => created = true,
                Err(e) => create_error = Some(e),
            }
        }

        if !path.is_dir() {
            return Err(DirectoryError::CreateFailed {
                path: path.to_path_buf(),
                source: create_error,
            });
        }

        let absolute = fs::canonicalize(path).map_err(|source| DirectoryError::CreateFailed {
            path: path.to_path_buf(),
            source: Some(source),
        })?;

        Ok(PreparedDirectory {
            path: absolute,
            dropped,
            created,
        })
    }
}
