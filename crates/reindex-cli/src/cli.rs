//! CLI argument parsing for search-reindex.
//!
//! CLI flags override every other configuration source.

use clap::{Args, Parser, Subcommand};

use reindex_types::Settings;

/// Search Reindex
///
/// Rebuilds the full-text search index from the relational store.
#[derive(Parser, Debug)]
#[command(name = "search-reindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/search-reindex/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the index
    Run {
        #[command(flatten)]
        overrides: RunOverrides,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the indexable types and their index targets
    Catalog {
        /// Override mapping file
        #[arg(short, long)]
        mapping: Option<String>,

        /// Override index directory
        #[arg(short, long)]
        index_dir: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show document counts of an existing index
    Stats {
        /// Override index directory
        #[arg(short, long)]
        index_dir: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Settings overrides accepted by `run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// Override store connection URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Override mapping file
    #[arg(short, long)]
    pub mapping: Option<String>,

    /// Override index directory
    #[arg(short, long)]
    pub index_dir: Option<String>,

    /// Override directory provider (filesystem, ram)
    #[arg(long)]
    pub directory_provider: Option<String>,

    /// Keep the existing index directory instead of dropping it
    #[arg(long)]
    pub no_drop: bool,

    /// Do nothing and report the run as skipped
    #[arg(long)]
    pub skip: bool,
}

impl RunOverrides {
    /// Apply the flags that were given.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.url {
            settings.url = url.clone();
        }
        if let Some(mapping) = &self.mapping {
            settings.mapping = mapping.clone();
        }
        if let Some(index_dir) = &self.index_dir {
            settings.index_dir = index_dir.clone();
        }
        if let Some(provider) = &self.directory_provider {
            settings.directory_provider = Some(provider.clone());
        }
        if self.no_drop {
            settings.drop = false;
        }
        if self.skip {
            settings.skip = true;
        }
    }
}
