//! Job entry points: settings in, report out.

use serde::Serialize;
use tracing::info;

use reindex_search::{DirectoryProvider, SearchIndexConfig, TantivyBackend};
use reindex_store::EntityCatalog;
use reindex_types::{IndexTarget, Settings};

use crate::error::ReindexError;
use crate::events::{PipelineEvent, RunObserver};
use crate::pipeline::{PipelineOptions, ReindexPipeline};
use crate::report::RunReport;
use crate::resources::{load_mapping, RunResources};
use crate::state::{CancelFlag, RunState};

/// Run the reindex job against SQLite and Tantivy.
pub fn run_job(settings: &Settings, observer: &dyn RunObserver, cancel: CancelFlag) -> RunReport {
    if settings.skip {
        info!("Skip flag set; not reindexing");
        observer.on_event(&PipelineEvent::Skipped);
        return RunReport::skipped();
    }

    let options = match pipeline_options(settings) {
        Ok(options) => options,
        Err(e) => return failed_before_start(e, observer),
    };
    let resources = match RunResources::acquire(settings) {
        Ok(resources) => resources,
        Err(e) => return failed_before_start(e, observer),
    };

    let backend = TantivyBackend;
    let pipeline = ReindexPipeline::new(
        resources.connector(),
        &backend,
        resources.metadata(),
        options,
    )
    .with_cancel(cancel);
    pipeline.run(observer)
}

/// Index-side options from settings.
pub fn pipeline_options(settings: &Settings) -> Result<PipelineOptions, ReindexError> {
    settings.validate().map_err(ReindexError::config)?;
    Ok(PipelineOptions::new(settings.expanded_index_dir())
        .with_drop_existing(settings.drop)
        .with_provider(directory_provider(settings)?)
        .with_writer_memory_mb(settings.writer_memory_mb))
}

fn directory_provider(settings: &Settings) -> Result<DirectoryProvider, ReindexError> {
    match settings.directory_provider() {
        Some(name) => name
            .parse::<DirectoryProvider>()
            .map_err(ReindexError::config),
        None => Ok(DirectoryProvider::default()),
    }
}

fn failed_before_start(error: ReindexError, observer: &dyn RunObserver) -> RunReport {
    observer.on_event(&PipelineEvent::Failed {
        kind: error.kind(),
        message: error.to_string(),
    });
    observer.on_event(&PipelineEvent::Closed {
        state: RunState::Failed,
    });
    RunReport::failed(error)
}

/// One indexable type as the catalog sees it.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub table: Option<String>,
    pub fields: Vec<String>,
    pub targets: Vec<IndexTarget>,
}

/// List the indexable types and where they would be written, without
/// touching the store or the index.
pub fn describe_catalog(settings: &Settings) -> Result<Vec<CatalogEntry>, ReindexError> {
    let (_, metadata) = load_mapping(settings)?;
    let config = SearchIndexConfig::new(settings.expanded_index_dir())
        .with_provider(directory_provider(settings)?);

    Ok(EntityCatalog::discover(&metadata)
        .types()
        .iter()
        .map(|record_type| {
            let entity = record_type.metadata();
            CatalogEntry {
                name: record_type.name().to_string(),
                table: entity.table.clone(),
                fields: entity.fields.iter().map(|f| f.name.clone()).collect(),
                targets: config.targets(entity),
            }
        })
        .collect())
}
