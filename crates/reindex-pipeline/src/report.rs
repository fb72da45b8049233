//! Run report returned by every run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use reindex_types::IndexTarget;

use crate::error::ReindexError;
use crate::state::RunState;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failure,
    Skipped,
}

/// Result for one indexed type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeReport {
    pub record_type: String,
    pub records: u64,
    pub targets: Vec<IndexTarget>,
    /// The type's batch was committed
    pub committed: bool,
}

/// Summary of one run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub final_state: RunState,
    pub index_dir: Option<PathBuf>,
    pub types: Vec<TypeReport>,
    pub documents_flushed: u64,
    pub error: Option<ReindexError>,
    /// Cleanup problems that did not change the outcome
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn started() -> Self {
        let now = Utc::now();
        Self {
            outcome: RunOutcome::Failure,
            final_state: RunState::Idle,
            index_dir: None,
            types: Vec::new(),
            documents_flushed: 0,
            error: None,
            warnings: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Report for a run that stopped before the pipeline started.
    pub fn failed(error: ReindexError) -> Self {
        let mut report = Self::started();
        report.final_state = RunState::Failed;
        report.error = Some(error);
        report
    }

    pub fn skipped() -> Self {
        let mut report = Self::started();
        report.outcome = RunOutcome::Skipped;
        report
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Success
    }

    /// Records indexed across all committed types.
    pub fn total_records(&self) -> u64 {
        self.types
            .iter()
            .filter(|t| t.committed)
            .map(|t| t.records)
            .sum()
    }

    pub fn records_for(&self, record_type: &str) -> Option<u64> {
        self.types
            .iter()
            .find(|t| t.record_type == record_type && t.committed)
            .map(|t| t.records)
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
