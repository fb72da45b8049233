//! Run state machine states.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Where a run is.
///
/// `Idle -> DirectoryPrepared -> SessionOpen -> (Fetching -> Staging ->
/// Committing -> SessionOpen)* -> Flushed -> Closed`, or `Failed` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    DirectoryPrepared,
    SessionOpen,
    Fetching,
    Staging,
    Committing,
    Flushed,
    Closed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Closed | RunState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::DirectoryPrepared => "directory_prepared",
            RunState::SessionOpen => "session_open",
            RunState::Fetching => "fetching",
            RunState::Staging => "staging",
            RunState::Committing => "committing",
            RunState::Flushed => "flushed",
            RunState::Closed => "closed",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared cancellation flag, checked before each type and between records.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
