//! Configuration loading for the reindex job.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/search-reindex/config.toml.

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;

/// Driver used when none is configured.
pub const DEFAULT_DRIVER: &str = "sqlite";

/// Job settings, resolved once before a run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Store connection URL (`sqlite://path/to/db`, `file:...`, or a plain path)
    #[serde(default)]
    pub url: String,

    /// Store driver identifier
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Store user name, if the driver needs one
    #[serde(default)]
    pub username: Option<String>,

    /// Store password (wrapped in a secret once resolved, never logged)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// SQL dialect hint, checked against the driver
    #[serde(default)]
    pub dialect: Option<String>,

    /// Index base directory
    #[serde(default = "default_index_dir")]
    pub index_dir: String,

    /// Directory provider override ("filesystem" or "ram")
    #[serde(default)]
    pub directory_provider: Option<String>,

    /// Path to the entity mapping file
    #[serde(default = "default_mapping")]
    pub mapping: String,

    /// Extra directories searched when the mapping path is relative
    #[serde(default)]
    pub resource_roots: Vec<String>,

    /// Drop the index directory before rebuilding
    #[serde(default = "default_true")]
    pub drop: bool,

    /// Skip the run entirely
    #[serde(default)]
    pub skip: bool,

    /// Number of root records pulled from the store per page
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    /// Memory budget for each index writer in MB. One writer is open per
    /// partition and committed batches keep theirs until the final flush, so
    /// peak usage is roughly partitions across all types times this value.
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

fn default_index_dir() -> String {
    ProjectDirs::from("", "", "search-reindex")
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./search-index"))
        .to_string_lossy()
        .to_string()
}

fn default_mapping() -> String {
    "search-mapping.toml".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fetch_size() -> usize {
    500
}

fn default_writer_memory_mb() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: String::new(),
            driver: default_driver(),
            username: None,
            password: None,
            dialect: None,
            index_dir: default_index_dir(),
            directory_provider: None,
            mapping: default_mapping(),
            resource_roots: Vec::new(),
            drop: true,
            skip: false,
            fetch_size: default_fetch_size(),
            writer_memory_mb: default_writer_memory_mb(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/search-reindex/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (REINDEX_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "search-reindex")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("driver", default_driver())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("index_dir", default_index_dir())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("mapping", default_mapping())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("drop", true)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("fetch_size", default_fetch_size() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // REINDEX_URL, REINDEX_INDEX_DIR, REINDEX_RESOURCE_ROOTS=a,b ...
        builder = builder.add_source(
            Environment::with_prefix("REINDEX")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("resource_roots")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))
    }

    /// Check the values a run cannot start without.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.url.trim().is_empty() {
            return Err(TypesError::Config("url is required".to_string()));
        }
        if self.driver.trim().is_empty() {
            return Err(TypesError::Config("driver is required".to_string()));
        }
        if self.index_dir.trim().is_empty() {
            return Err(TypesError::Config("index_dir is required".to_string()));
        }
        if self.mapping.trim().is_empty() {
            return Err(TypesError::Config("mapping is required".to_string()));
        }
        if self.fetch_size == 0 {
            return Err(TypesError::Config("fetch_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Index directory with a leading `~/` expanded.
    pub fn expanded_index_dir(&self) -> PathBuf {
        expand_home(&self.index_dir)
    }

    /// Mapping path with a leading `~/` expanded.
    pub fn expanded_mapping(&self) -> PathBuf {
        expand_home(&self.mapping)
    }

    /// Directory provider name, ignoring blank overrides.
    pub fn directory_provider(&self) -> Option<&str> {
        self.directory_provider
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Dialect hint, ignoring blank values.
    pub fn dialect(&self) -> Option<&str> {
        self.dialect
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
