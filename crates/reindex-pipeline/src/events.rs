//! Progress events emitted on state transitions.
//!
//! The pipeline never logs run progress directly; it hands events to a
//! [`RunObserver`]. [`LoggingObserver`] turns them into `tracing` output.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use reindex_types::IndexTarget;

use crate::error::ErrorKind;
use crate::state::RunState;

/// Cleanup step, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStep {
    Flush,
    CloseSession,
    CloseConnection,
}

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Skipped,
    DirectoryPrepared {
        path: PathBuf,
        dropped: bool,
        created: bool,
    },
    SessionOpened,
    TypesDiscovered {
        types: Vec<String>,
    },
    TypeStarted {
        record_type: String,
    },
    TargetsResolved {
        record_type: String,
        targets: Vec<IndexTarget>,
    },
    TypeCommitted {
        record_type: String,
        records: u64,
    },
    Flushed {
        documents: u64,
    },
    CleanupWarning {
        step: CleanupStep,
        message: String,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
    Closed {
        state: RunState,
    },
}

/// Receives run events.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Drops every event.
pub struct NoOpObserver;

impl RunObserver for NoOpObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Logs events through `tracing`.
pub struct LoggingObserver;

impl RunObserver for LoggingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Skipped => info!("Reindex skipped"),
            PipelineEvent::DirectoryPrepared {
                path,
                dropped,
                created,
            } => {
                if *dropped {
                    info!(path = ?path, "Dropped index directory");
                }
                info!(path = ?path, created, "Index directory ready");
            }
            PipelineEvent::SessionOpened => info!("Store connection and index session open"),
            PipelineEvent::TypesDiscovered { types } => {
                info!(count = types.len(), types = ?types, "Discovered indexable types")
            }
            PipelineEvent::TypeStarted { record_type } => {
                info!(record_type = %record_type, "Indexing type")
            }
            PipelineEvent::TargetsResolved {
                record_type,
                targets,
            } => {
                for target in targets {
                    info!(record_type = %record_type, target = %target.location, shard = target.shard, "Index target");
                }
            }
            PipelineEvent::TypeCommitted {
                record_type,
                records,
            } => info!(record_type = %record_type, records, "Committed type"),
            PipelineEvent::Flushed { documents } => info!(documents, "Index flushed"),
            PipelineEvent::CleanupWarning { step, message } => {
                warn!(step = ?step, error = %message, "Cleanup step failed")
            }
            PipelineEvent::Failed { kind, message } => {
                warn!(kind = %kind, error = %message, "Reindex failed")
            }
            PipelineEvent::Closed { state } => info!(state = %state, "Reindex finished"),
        }
    }
}

/// Keeps every event, for tests and reports.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

/// Forwards each event to several observers.
pub struct FanOutObserver<'a> {
    observers: Vec<&'a dyn RunObserver>,
}

impl<'a> FanOutObserver<'a> {
    pub fn new(observers: Vec<&'a dyn RunObserver>) -> Self {
        Self { observers }
    }
}

impl RunObserver for FanOutObserver<'_> {
    fn on_event(&self, event: &PipelineEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
