//! # reindex-pipeline
//!
//! Orchestrates a one-shot rebuild of the full-text index from the
//! relational store.
//!
//! A run prepares the index directory, opens one store connection and one
//! index session, indexes each searchable type in its own read transaction
//! and index batch, flushes once, and always cleans up in the same order.
//! Progress is reported as [`PipelineEvent`]s to a [`RunObserver`]; the
//! outcome comes back as a [`RunReport`].

pub mod error;
pub mod events;
pub mod job;
pub mod pipeline;
pub mod report;
pub mod resources;
pub mod state;

pub use error::{Cause, ErrorKind, ReindexError};
pub use events::{
    CleanupStep, FanOutObserver, LoggingObserver, NoOpObserver, PipelineEvent, RecordingObserver,
    RunObserver,
};
pub use job::{describe_catalog, pipeline_options, run_job, CatalogEntry};
pub use pipeline::{PipelineOptions, ReindexPipeline};
pub use report::{RunOutcome, RunReport, TypeReport};
pub use resources::{load_mapping, resolve_resource, RunResources};
pub use state::{CancelFlag, RunState};
