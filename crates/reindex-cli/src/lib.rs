//! search-reindex library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (run, catalog, stats)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, RunOverrides};
pub use commands::{init_logging, load_settings, run_reindex, show_catalog, show_stats};
