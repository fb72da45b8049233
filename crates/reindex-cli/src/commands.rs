//! Command implementations.

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{info, warn};

use reindex_pipeline::{
    describe_catalog, run_job, CancelFlag, LoggingObserver, RunOutcome, RunReport,
};
use reindex_search::index_stats;
use reindex_store::redact_url;
use reindex_types::Settings;

use crate::cli::RunOverrides;

/// Load settings (defaults -> file -> env) and apply the log-level flag.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Rebuild the index.
///
/// The run itself is blocking and happens off the runtime; SIGINT/SIGTERM
/// only raise the cancel flag so cleanup still runs.
pub async fn run_reindex(
    config_path: Option<&str>,
    log_level: Option<&str>,
    overrides: &RunOverrides,
    json: bool,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    overrides.apply(&mut settings);
    init_logging(&settings)?;

    info!(
        url = %redact_url(&settings.url),
        index_dir = %settings.index_dir,
        mapping = %settings.mapping,
        drop = settings.drop,
        "Search reindex starting"
    );

    let cancel = CancelFlag::new();
    let watcher = tokio::spawn(cancel_on_shutdown(cancel.clone()));
    let report = tokio::task::spawn_blocking(move || run_job(&settings, &LoggingObserver, cancel))
        .await
        .context("Reindex task panicked")?;
    watcher.abort();

    print_report(&report, json)?;
    match report.outcome {
        RunOutcome::Success | RunOutcome::Skipped => Ok(()),
        RunOutcome::Failure => match report.error {
            Some(error) => Err(error).context("Reindex failed"),
            None => bail!("Reindex failed"),
        },
    }
}

async fn cancel_on_shutdown(cancel: CancelFlag) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling run...");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling run...");
        }
    }
    cancel.cancel();
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to encode report")?
        );
        return Ok(());
    }

    println!("Outcome: {:?} ({})", report.outcome, report.final_state);
    if let Some(dir) = &report.index_dir {
        println!("Index directory: {}", dir.display());
    }
    for ty in &report.types {
        let status = if ty.committed { "committed" } else { "aborted" };
        println!("  {:<24} {:>8} records  {}", ty.record_type, ty.records, status);
    }
    println!(
        "Documents flushed: {} in {} ms",
        report.documents_flushed,
        report.elapsed_ms()
    );
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
    Ok(())
}

/// List indexable types without running.
pub fn show_catalog(
    config_path: Option<&str>,
    log_level: Option<&str>,
    mapping: Option<&str>,
    index_dir: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    if let Some(mapping) = mapping {
        settings.mapping = mapping.to_string();
    }
    if let Some(index_dir) = index_dir {
        settings.index_dir = index_dir.to_string();
    }
    init_logging(&settings)?;

    let entries = describe_catalog(&settings).context("Failed to read catalog")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No searchable types in {}", settings.mapping);
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{} (table: {})",
            entry.name,
            entry.table.as_deref().unwrap_or("<none>")
        );
        println!("  fields: {}", entry.fields.join(", "));
        for target in &entry.targets {
            println!("  target: {}", target);
        }
    }
    Ok(())
}

/// Document counts of an existing index.
pub fn show_stats(
    config_path: Option<&str>,
    log_level: Option<&str>,
    index_dir: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    if let Some(index_dir) = index_dir {
        settings.index_dir = index_dir.to_string();
    }
    init_logging(&settings)?;

    let path = settings.expanded_index_dir();
    let stats = index_stats(&path)
        .with_context(|| format!("Failed to read index at {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Index: {}", path.display());
    for partition in &stats {
        println!(
            "  {:<24} {:>8} docs  {:>3} segments",
            partition.name, partition.num_docs, partition.num_segments
        );
    }
    println!(
        "Total: {} docs",
        stats.iter().map(|p| p.num_docs).sum::<u64>()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_settings_applies_log_level() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reindex.toml");
        fs::write(&path, "url = \"app.db\"\nlog_level = \"warn\"\n").unwrap();

        let settings = load_settings(path.to_str(), Some("debug")).unwrap();
        assert_eq!(settings.url, "app.db");
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_print_report_json() {
        let report = RunReport::skipped();
        assert!(print_report(&report, true).is_ok());
        assert!(print_report(&report, false).is_ok());
    }
}
