//! Search Reindex
//!
//! Rebuilds the full-text search index from the relational store in one
//! pass.
//!
//! # Usage
//!
//! ```bash
//! search-reindex run [--url URL] [--mapping FILE] [--index-dir DIR] [--no-drop] [--json]
//! search-reindex catalog [--mapping FILE]
//! search-reindex stats [--index-dir DIR]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/search-reindex/config.toml)
//! 3. `--config` file
//! 4. Environment variables (REINDEX_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use reindex_cli::{run_reindex, show_catalog, show_stats, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { overrides, json } => {
            run_reindex(
                cli.config.as_deref(),
                cli.log_level.as_deref(),
                &overrides,
                json,
            )
            .await?;
        }
        Commands::Catalog {
            mapping,
            index_dir,
            json,
        } => {
            show_catalog(
                cli.config.as_deref(),
                cli.log_level.as_deref(),
                mapping.as_deref(),
                index_dir.as_deref(),
                json,
            )?;
        }
        Commands::Stats { index_dir, json } => {
            show_stats(
                cli.config.as_deref(),
                cli.log_level.as_deref(),
                index_dir.as_deref(),
                json,
            )?;
        }
    }

    Ok(())
}
