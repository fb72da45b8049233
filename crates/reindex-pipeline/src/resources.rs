//! Scoped resources for one run.
//!
//! Resolves the mapping file against the configured resource roots and the
//! store driver up front. Nothing global is touched; dropping the handle
//! releases everything it resolved.

use std::path::{Path, PathBuf};

use tracing::debug;

use reindex_store::{ConnectionSettings, SqliteConnector, StoreMetadata};
use reindex_types::{Settings, TypesError};

use crate::error::ReindexError;

/// Mapping and driver resolved for a run.
pub struct RunResources {
    mapping_path: PathBuf,
    metadata: StoreMetadata,
    connector: SqliteConnector,
}

impl RunResources {
    /// Resolve the mapping and the store driver.
    ///
    /// A missing or invalid mapping is a `Config` failure; a driver or
    /// dialect the store cannot serve is a `Connect` failure.
    pub fn acquire(settings: &Settings) -> Result<Self, ReindexError> {
        let (mapping_path, metadata) = load_mapping(settings)?;

        let connection = ConnectionSettings::new(settings.url.clone())
            .with_driver(settings.driver.clone())
            .with_credentials(settings.username.clone(), settings.password.clone())
            .with_dialect(settings.dialect().map(String::from))
            .with_fetch_size(settings.fetch_size);
        let connector = SqliteConnector::new(connection)
            .map_err(|e| ReindexError::connect("loading the store driver failed", e))?;

        debug!(mapping = ?mapping_path, entities = metadata.len(), "Acquired run resources");
        Ok(Self {
            mapping_path,
            metadata,
            connector,
        })
    }

    pub fn mapping_path(&self) -> &Path {
        &self.mapping_path
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    pub fn connector(&self) -> &SqliteConnector {
        &self.connector
    }
}

impl Drop for RunResources {
    fn drop(&mut self) {
        debug!(mapping = ?self.mapping_path, "Released run resources");
    }
}

/// Find and parse the mapping file.
pub fn load_mapping(settings: &Settings) -> Result<(PathBuf, StoreMetadata), ReindexError> {
    let roots: Vec<PathBuf> = settings.resource_roots.iter().map(PathBuf::from).collect();
    let requested = settings.expanded_mapping();
    let path = resolve_resource(&requested, &roots).ok_or_else(|| {
        ReindexError::config(TypesError::Config(format!(
            "mapping file {} not found (resource roots: {:?})",
            requested.display(),
            roots
        )))
    })?;

    let metadata = StoreMetadata::load(&path).map_err(ReindexError::config)?;
    Ok((path, metadata))
}

/// Absolute paths are taken as-is; relative ones are tried against the
/// working directory, then each root in order.
pub fn resolve_resource(path: &Path, roots: &[PathBuf]) -> Option<PathBuf> {
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    std::iter::once(path.to_path_buf())
        .chain(roots.iter().map(|root| root.join(path)))
        .find(|candidate| candidate.is_file())
}
