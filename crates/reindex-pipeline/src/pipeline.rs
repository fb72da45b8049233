//! The reindex run state machine.
//!
//! One run prepares the index directory, opens exactly one store connection
//! and one index session, indexes every discovered type in catalog order
//! (one read transaction and one index batch per type), flushes once, and
//! then always cleans up in the same order: flush (best effort), close the
//! session, close the connection.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info};

use reindex_search::{
    DirectoryProvider, IndexBackend, IndexDirectoryManager, IndexSession, SearchIndexConfig,
};
use reindex_store::{EntityCatalog, RecordSource, StoreConnector, StoreMetadata};
use reindex_types::RecordType;

use crate::error::ReindexError;
use crate::events::{CleanupStep, PipelineEvent, RunObserver};
use crate::report::{RunOutcome, RunReport, TypeReport};
use crate::state::{CancelFlag, RunState};

/// Index-side options resolved before the run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub index_dir: PathBuf,
    pub drop_existing: bool,
    pub provider: DirectoryProvider,
    pub writer_memory_mb: usize,
}

impl PipelineOptions {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            drop_existing: true,
            provider: DirectoryProvider::default(),
            writer_memory_mb: 50,
        }
    }

    pub fn with_drop_existing(mut self, drop_existing: bool) -> Self {
        self.drop_existing = drop_existing;
        self
    }

    pub fn with_provider(mut self, provider: DirectoryProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_writer_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }
}

/// The store connection and index session of one run.
struct RunContext<S, I> {
    source: S,
    session: I,
}

/// Tracks state, report and first failure while a run progresses.
struct RunTracker<'o> {
    state: RunState,
    observer: &'o dyn RunObserver,
    report: RunReport,
    flush_attempted: bool,
}

impl<'o> RunTracker<'o> {
    fn new(observer: &'o dyn RunObserver) -> Self {
        Self {
            state: RunState::Idle,
            observer,
            report: RunReport::started(),
            flush_attempted: false,
        }
    }

    fn transition(&mut self, to: RunState) {
        debug!(from = %self.state, to = %to, "State transition");
        self.state = to;
    }

    fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }

    /// Record a fatal error. Only the first one is kept.
    fn fail(&mut self, error: ReindexError) {
        if self.report.error.is_none() {
            self.emit(PipelineEvent::Failed {
                kind: error.kind(),
                message: error.to_string(),
            });
            self.report.error = Some(error);
        } else {
            debug!(error = %error, "Ignoring error after first failure");
        }
        self.transition(RunState::Failed);
    }

    fn cleanup_warning(&mut self, step: CleanupStep, message: String) {
        self.emit(PipelineEvent::CleanupWarning {
            step,
            message: message.clone(),
        });
        self.report.warnings.push(format!("{:?}: {}", step, message));
    }

    fn current_type(&mut self) -> Option<&mut TypeReport> {
        self.report.types.last_mut()
    }

    fn finish(mut self) -> RunReport {
        if self.report.error.is_none() && self.state == RunState::Flushed {
            self.transition(RunState::Closed);
            self.report.outcome = RunOutcome::Success;
        } else {
            self.transition(RunState::Failed);
            self.report.outcome = RunOutcome::Failure;
        }
        self.report.final_state = self.state;
        self.report.finished_at = Utc::now();
        self.emit(PipelineEvent::Closed { state: self.state });
        self.report
    }
}

/// Orchestrates one reindex run over a store connector and an index backend.
pub struct ReindexPipeline<'r, C, B> {
    connector: &'r C,
    backend: &'r B,
    metadata: &'r StoreMetadata,
    options: PipelineOptions,
    cancel: CancelFlag,
}

impl<'r, C, B> ReindexPipeline<'r, C, B>
where
    C: StoreConnector,
    B: IndexBackend,
{
    pub fn new(
        connector: &'r C,
        backend: &'r B,
        metadata: &'r StoreMetadata,
        options: PipelineOptions,
    ) -> Self {
        Self {
            connector,
            backend,
            metadata,
            options,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute the run. Never panics on run failures; they end up in the report.
    pub fn run(&self, observer: &dyn RunObserver) -> RunReport {
        let mut tracker = RunTracker::new(observer);
        info!(
            index_dir = ?self.options.index_dir,
            drop = self.options.drop_existing,
            provider = self.options.provider.as_str(),
            "Starting reindex"
        );

        let prepared = match IndexDirectoryManager::prepare(
            &self.options.index_dir,
            self.options.drop_existing,
        ) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracker.fail(ReindexError::directory(e));
                return tracker.finish();
            }
        };
        tracker.report.index_dir = Some(prepared.path.clone());
        tracker.transition(RunState::DirectoryPrepared);
        tracker.emit(PipelineEvent::DirectoryPrepared {
            path: prepared.path.clone(),
            dropped: prepared.dropped,
            created: prepared.created,
        });

        let config = SearchIndexConfig::new(prepared.path)
            .with_provider(self.options.provider)
            .with_memory_mb(self.options.writer_memory_mb);

        let source = match self.connector.connect() {
            Ok(source) => source,
            Err(e) => {
                tracker.fail(ReindexError::connect(
                    "opening the store connection failed",
                    e,
                ));
                return tracker.finish();
            }
        };
        let session = match self.backend.open_session(&config) {
            Ok(session) => session,
            Err(e) => {
                tracker.fail(ReindexError::connect("opening the index session failed", e));
                close_connection(source, &mut tracker);
                return tracker.finish();
            }
        };

        let mut context = RunContext { source, session };
        tracker.transition(RunState::SessionOpen);
        tracker.emit(PipelineEvent::SessionOpened);

        match self.index_all(&mut context, &mut tracker) {
            Ok(()) => flush(&mut context.session, &mut tracker),
            Err(e) => tracker.fail(e),
        }

        cleanup(context, &mut tracker);
        tracker.finish()
    }

    fn index_all<S, I>(
        &self,
        context: &mut RunContext<S, I>,
        tracker: &mut RunTracker<'_>,
    ) -> Result<(), ReindexError>
    where
        S: RecordSource,
        I: IndexSession,
    {
        let catalog = EntityCatalog::discover(self.metadata);
        tracker.emit(PipelineEvent::TypesDiscovered {
            types: catalog.names().into_iter().map(String::from).collect(),
        });

        for record_type in catalog.types() {
            if self.cancel.is_cancelled() {
                return Err(ReindexError::cancelled(None));
            }
            self.index_type(context, record_type, tracker)?;
        }
        Ok(())
    }

    fn index_type<S, I>(
        &self,
        context: &mut RunContext<S, I>,
        record_type: &RecordType,
        tracker: &mut RunTracker<'_>,
    ) -> Result<(), ReindexError>
    where
        S: RecordSource,
        I: IndexSession,
    {
        let name = record_type.name();
        tracker.emit(PipelineEvent::TypeStarted {
            record_type: name.to_string(),
        });

        let targets = context.session.targets(record_type);
        tracker.emit(PipelineEvent::TargetsResolved {
            record_type: name.to_string(),
            targets: targets.clone(),
        });
        tracker.report.types.push(TypeReport {
            record_type: name.to_string(),
            records: 0,
            targets,
            committed: false,
        });

        tracker.transition(RunState::Fetching);
        context
            .source
            .begin_read(record_type)
            .map_err(|e| ReindexError::read(name, e))?;
        let records = context
            .source
            .fetch_all(record_type)
            .map_err(|e| ReindexError::read(name, e))?;

        let batch = context
            .session
            .begin_batch(record_type)
            .map_err(|e| ReindexError::stage(name, e))?;
        tracker.transition(RunState::Staging);

        let mut staged = 0u64;
        for record in records {
            if self.cancel.is_cancelled() {
                return Err(ReindexError::cancelled(Some(name)));
            }
            let record = record.map_err(|e| ReindexError::read(name, e))?;
            context
                .session
                .stage(&batch, &record)
                .map_err(|e| ReindexError::stage(name, e))?;
            staged += 1;
            if let Some(report) = tracker.current_type() {
                report.records = staged;
            }
        }

        context
            .source
            .end_read()
            .map_err(|e| ReindexError::read(name, e))?;

        tracker.transition(RunState::Committing);
        let committed = context
            .session
            .commit_batch(batch)
            .map_err(|e| ReindexError::commit(name, e))?;
        if let Some(report) = tracker.current_type() {
            report.records = committed;
            report.committed = true;
        }
        tracker.emit(PipelineEvent::TypeCommitted {
            record_type: name.to_string(),
            records: committed,
        });
        tracker.transition(RunState::SessionOpen);
        Ok(())
    }
}

fn flush<I: IndexSession>(session: &mut I, tracker: &mut RunTracker<'_>) {
    tracker.flush_attempted = true;
    match session.flush() {
        Ok(documents) => {
            tracker.report.documents_flushed = documents;
            tracker.transition(RunState::Flushed);
            tracker.emit(PipelineEvent::Flushed { documents });
        }
        Err(e) => tracker.fail(ReindexError::flush(e)),
    }
}

/// Flush (unless already attempted), close the session, close the connection.
fn cleanup<S, I>(context: RunContext<S, I>, tracker: &mut RunTracker<'_>)
where
    S: RecordSource,
    I: IndexSession,
{
    let RunContext {
        source,
        mut session,
    } = context;

    if !tracker.flush_attempted {
        tracker.flush_attempted = true;
        match session.flush() {
            Ok(documents) => tracker.report.documents_flushed += documents,
            Err(e) if tracker.report.error.is_none() => tracker.fail(ReindexError::flush(e)),
            Err(e) => tracker.cleanup_warning(CleanupStep::Flush, e.to_string()),
        }
    }

    if let Err(e) = session.close() {
        tracker.cleanup_warning(CleanupStep::CloseSession, e.to_string());
    }
    close_connection(source, tracker);
}

fn close_connection<S: RecordSource>(source: S, tracker: &mut RunTracker<'_>) {
    if let Err(e) = source.close() {
        tracker.cleanup_warning(CleanupStep::CloseConnection, e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use reindex_search::{BatchHandle, SearchError};
    use reindex_store::{RecordStream, StoreError};
    use reindex_types::{EntityMetadata, IndexTarget, RecordInstance, TargetLocation};
    use tempfile::TempDir;

    use crate::error::ErrorKind;
    use crate::events::{NoOpObserver, RecordingObserver};

    type CallLog = Rc<RefCell<Vec<String>>>;

    fn log(calls: &CallLog, call: impl Into<String>) {
        calls.borrow_mut().push(call.into());
    }

    #[derive(Default)]
    struct Faults {
        connect: bool,
        read: Option<&'static str>,
        open_session: bool,
        stage: Option<&'static str>,
        flush: bool,
        close_session: bool,
        close_connection: bool,
    }

    struct MockStore {
        calls: CallLog,
        rows: Rc<Vec<RecordInstance>>,
        faults: Rc<Faults>,
    }

    struct MockSource {
        calls: CallLog,
        rows: Rc<Vec<RecordInstance>>,
        faults: Rc<Faults>,
    }

    impl StoreConnector for MockStore {
        type Source = MockSource;

        fn connect(&self) -> Result<MockSource, StoreError> {
            log(&self.calls, "connect");
            if self.faults.connect {
                return Err(StoreError::UnsupportedDriver("mock".into()));
            }
            Ok(MockSource {
                calls: self.calls.clone(),
                rows: self.rows.clone(),
                faults: self.faults.clone(),
            })
        }
    }

    impl RecordSource for MockSource {
        fn begin_read(&mut self, record_type: &RecordType) -> Result<(), StoreError> {
            log(&self.calls, format!("begin_read:{}", record_type));
            Ok(())
        }

        fn fetch_all(&mut self, record_type: &RecordType) -> Result<RecordStream<'_>, StoreError> {
            log(&self.calls, format!("fetch:{}", record_type));
            if self.faults.read == Some(record_type.name()) {
                return Err(StoreError::Mapping("no such table".into()));
            }
            let name = record_type.name().to_string();
            let rows: Vec<_> = self
                .rows
                .iter()
                .filter(|r| r.record_type() == name)
                .cloned()
                .collect();
            Ok(Box::new(rows.into_iter().map(Ok)))
        }

        fn end_read(&mut self) -> Result<(), StoreError> {
            log(&self.calls, "end_read");
            Ok(())
        }

        fn close(self) -> Result<(), StoreError> {
            log(&self.calls, "close_connection");
            if self.faults.close_connection {
                return Err(StoreError::Mapping("close failed".into()));
            }
            Ok(())
        }
    }

    struct MockBackend {
        calls: CallLog,
        faults: Rc<Faults>,
    }

    struct MockSession {
        calls: CallLog,
        faults: Rc<Faults>,
        staged: u64,
        pending: u64,
        next_batch: u64,
    }

    impl IndexBackend for MockBackend {
        type Session = MockSession;

        fn open_session(&self, _config: &SearchIndexConfig) -> Result<MockSession, SearchError> {
            log(&self.calls, "open_session");
            if self.faults.open_session {
                return Err(SearchError::UnknownProvider("mock".into()));
            }
            Ok(MockSession {
                calls: self.calls.clone(),
                faults: self.faults.clone(),
                staged: 0,
                pending: 0,
                next_batch: 0,
            })
        }
    }

    impl IndexSession for MockSession {
        fn targets(&self, record_type: &RecordType) -> Vec<IndexTarget> {
            vec![IndexTarget {
                record_type: record_type.name().to_string(),
                shard: 0,
                location: TargetLocation::Ram(record_type.name().to_string()),
            }]
        }

        fn begin_batch(&mut self, record_type: &RecordType) -> Result<BatchHandle, SearchError> {
            log(&self.calls, format!("begin_batch:{}", record_type));
            self.next_batch += 1;
            self.staged = 0;
            Ok(BatchHandle::new(record_type.name(), self.next_batch))
        }

        fn stage(&mut self, batch: &BatchHandle, record: &RecordInstance) -> Result<(), SearchError> {
            if self.faults.stage == Some(batch.record_type()) {
                return Err(SearchError::SchemaMismatch(record.id().to_string()));
            }
            self.staged += 1;
            Ok(())
        }

        fn commit_batch(&mut self, batch: BatchHandle) -> Result<u64, SearchError> {
            log(&self.calls, format!("commit:{}", batch.record_type()));
            self.pending += self.staged;
            Ok(self.staged)
        }

        fn flush(&mut self) -> Result<u64, SearchError> {
            log(&self.calls, "flush");
            if self.faults.flush {
                return Err(SearchError::Io(std::io::Error::other("disk full")));
            }
            Ok(std::mem::take(&mut self.pending))
        }

        fn close(self) -> Result<(), SearchError> {
            log(&self.calls, "close_session");
            if self.faults.close_session {
                return Err(SearchError::Io(std::io::Error::other("lock held")));
            }
            Ok(())
        }
    }

    struct Harness {
        _temp_dir: TempDir,
        index_dir: PathBuf,
        calls: CallLog,
        store: MockStore,
        backend: MockBackend,
        metadata: StoreMetadata,
    }

    impl Harness {
        fn new(faults: Faults) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let index_dir = temp_dir.path().join("index");
            let calls: CallLog = Rc::default();
            let faults = Rc::new(faults);

            let mut rows = Vec::new();
            for id in 1..=3 {
                rows.push(RecordInstance::new("Customer", id.to_string()));
            }
            for id in 1..=2 {
                rows.push(RecordInstance::new("Order", id.to_string()));
            }
            rows.push(RecordInstance::new("Invoice", "1"));
            rows.push(RecordInstance::new("AuditLog", "1"));

            let metadata = StoreMetadata::new(vec![
                EntityMetadata::new("Customer", "customers").searchable(),
                EntityMetadata::new("AuditLog", "audit_log"),
                EntityMetadata::new("Order", "orders").searchable(),
                EntityMetadata::new("Invoice", "invoices").searchable(),
            ])
            .unwrap();

            Self {
                _temp_dir: temp_dir,
                index_dir,
                store: MockStore {
                    calls: calls.clone(),
                    rows: Rc::new(rows),
                    faults: faults.clone(),
                },
                backend: MockBackend {
                    calls: calls.clone(),
                    faults,
                },
                calls,
                metadata,
            }
        }

        fn pipeline(&self) -> ReindexPipeline<'_, MockStore, MockBackend> {
            ReindexPipeline::new(
                &self.store,
                &self.backend,
                &self.metadata,
                PipelineOptions::new(&self.index_dir),
            )
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls.borrow().iter().filter(|c| *c == call).count()
        }

        fn tail(&self, n: usize) -> Vec<String> {
            let calls = self.calls();
            calls[calls.len().saturating_sub(n)..].to_vec()
        }
    }

    fn cleanup_calls() -> Vec<String> {
        vec![
            "flush".to_string(),
            "close_session".to_string(),
            "close_connection".to_string(),
        ]
    }

    #[test]
    fn test_one_cycle_per_type_then_single_flush() {
        let harness = Harness::new(Faults::default());
        let report = harness.pipeline().run(&NoOpObserver);

        assert!(report.is_success(), "{:?}", report.error);
        assert_eq!(report.final_state, RunState::Closed);
        assert_eq!(
            harness.calls(),
            vec![
                "connect",
                "open_session",
                "begin_read:Customer",
                "fetch:Customer",
                "begin_batch:Customer",
                "end_read",
                "commit:Customer",
                "begin_read:Order",
                "fetch:Order",
                "begin_batch:Order",
                "end_read",
                "commit:Order",
                "begin_read:Invoice",
                "fetch:Invoice",
                "begin_batch:Invoice",
                "end_read",
                "commit:Invoice",
                "flush",
                "close_session",
                "close_connection",
            ]
        );
        assert_eq!(report.records_for("Customer"), Some(3));
        assert_eq!(report.records_for("AuditLog"), None);
        assert_eq!(report.total_records(), 6);
        assert_eq!(report.documents_flushed, 6);
        assert!(harness.index_dir.is_dir());
    }

    #[test]
    fn test_directory_failure_opens_nothing() {
        let harness = Harness::new(Faults::default());
        std::fs::write(&harness.index_dir, b"in the way").unwrap();
        let pipeline = ReindexPipeline::new(
            &harness.store,
            &harness.backend,
            &harness.metadata,
            PipelineOptions::new(&harness.index_dir).with_drop_existing(false),
        );

        let report = pipeline.run(&NoOpObserver);

        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Directory));
        assert_eq!(report.final_state, RunState::Failed);
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn test_connect_failure_leaves_prepared_directory() {
        let harness = Harness::new(Faults {
            connect: true,
            ..Default::default()
        });
        let report = harness.pipeline().run(&NoOpObserver);

        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Connect));
        assert_eq!(harness.calls(), vec!["connect"]);
        assert!(harness.index_dir.is_dir());
        assert_eq!(std::fs::read_dir(&harness.index_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_session_open_failure_closes_connection_only() {
        let harness = Harness::new(Faults {
            open_session: true,
            ..Default::default()
        });
        let report = harness.pipeline().run(&NoOpObserver);

        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Connect));
        assert_eq!(
            harness.calls(),
            vec!["connect", "open_session", "close_connection"]
        );
    }

    #[test]
    fn test_read_failure_on_second_type() {
        let harness = Harness::new(Faults {
            read: Some("Order"),
            ..Default::default()
        });
        let report = harness.pipeline().run(&NoOpObserver);

        let error = report.error.as_ref().unwrap();
        assert_eq!(error.kind(), ErrorKind::Read);
        assert_eq!(error.record_type(), Some("Order"));
        assert_eq!(harness.count("commit:Customer"), 1);
        assert_eq!(harness.count("commit:Order"), 0);
        assert_eq!(harness.count("begin_read:Invoice"), 0);
        assert_eq!(harness.tail(3), cleanup_calls());
        assert_eq!(harness.count("flush"), 1);
        assert_eq!(report.outcome, RunOutcome::Failure);
    }

    #[test]
    fn test_stage_failure() {
        let harness = Harness::new(Faults {
            stage: Some("Customer"),
            ..Default::default()
        });
        let report = harness.pipeline().run(&NoOpObserver);

        let error = report.error.as_ref().unwrap();
        assert_eq!(error.kind(), ErrorKind::Stage);
        assert_eq!(error.record_type(), Some("Customer"));
        assert_eq!(harness.count("commit:Customer"), 0);
        assert_eq!(harness.tail(3), cleanup_calls());
    }

    #[test]
    fn test_flush_failure_fails_run_once() {
        let harness = Harness::new(Faults {
            flush: true,
            ..Default::default()
        });
        let report = harness.pipeline().run(&NoOpObserver);

        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Flush));
        assert_eq!(harness.count("flush"), 1);
        assert_eq!(harness.tail(2), vec!["close_session", "close_connection"]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_cleanup_flush_failure_keeps_original_error() {
        let harness = Harness::new(Faults {
            read: Some("Invoice"),
            flush: true,
            ..Default::default()
        });
        let report = harness.pipeline().run(&NoOpObserver);

        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Read));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Flush"));
    }

    #[test]
    fn test_close_failures_are_warnings() {
        let harness = Harness::new(Faults {
            close_session: true,
            close_connection: true,
            ..Default::default()
        });
        let observer = RecordingObserver::new();
        let report = harness.pipeline().run(&observer);

        assert!(report.is_success());
        assert_eq!(report.warnings.len(), 2);
        let warnings: Vec<_> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::CleanupWarning { step, .. } => Some(step),
                _ => None,
            })
            .collect();
        assert_eq!(
            warnings,
            vec![CleanupStep::CloseSession, CleanupStep::CloseConnection]
        );
    }

    struct CancelOn {
        flag: CancelFlag,
        trigger: fn(&PipelineEvent) -> bool,
    }

    impl RunObserver for CancelOn {
        fn on_event(&self, event: &PipelineEvent) {
            if (self.trigger)(event) {
                self.flag.cancel();
            }
        }
    }

    #[test]
    fn test_cancel_before_next_type() {
        let harness = Harness::new(Faults::default());
        let flag = CancelFlag::new();
        let observer = CancelOn {
            flag: flag.clone(),
            trigger: |e| matches!(e, PipelineEvent::TypeCommitted { .. }),
        };
        let report = harness.pipeline().with_cancel(flag).run(&observer);

        let error = report.error.as_ref().unwrap();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert_eq!(error.record_type(), None);
        assert_eq!(harness.count("commit:Customer"), 1);
        assert_eq!(harness.count("begin_read:Order"), 0);
        assert_eq!(harness.tail(3), cleanup_calls());
    }

    #[test]
    fn test_cancel_between_records() {
        let harness = Harness::new(Faults::default());
        let flag = CancelFlag::new();
        let observer = CancelOn {
            flag: flag.clone(),
            trigger: |e| matches!(e, PipelineEvent::TargetsResolved { .. }),
        };
        let report = harness.pipeline().with_cancel(flag).run(&observer);

        let error = report.error.as_ref().unwrap();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert_eq!(error.record_type(), Some("Customer"));
        assert_eq!(harness.count("commit:Customer"), 0);
        assert_eq!(harness.tail(3), cleanup_calls());
    }

    #[test]
    fn test_events_follow_transitions() {
        let harness = Harness::new(Faults::default());
        let observer = RecordingObserver::new();
        harness.pipeline().run(&observer);

        let events = observer.events();
        assert!(matches!(events[0], PipelineEvent::DirectoryPrepared { created: true, .. }));
        assert_eq!(events[1], PipelineEvent::SessionOpened);
        assert_eq!(
            events[2],
            PipelineEvent::TypesDiscovered {
                types: vec!["Customer".into(), "Order".into(), "Invoice".into()]
            }
        );
        assert_eq!(
            events.last(),
            Some(&PipelineEvent::Closed {
                state: RunState::Closed
            })
        );
    }

    #[test]
    fn test_empty_catalog_still_flushes() {
        let mut harness = Harness::new(Faults::default());
        harness.metadata =
            StoreMetadata::new(vec![EntityMetadata::new("AuditLog", "audit_log")]).unwrap();
        let report = harness.pipeline().run(&NoOpObserver);

        assert!(report.is_success());
        assert_eq!(
            harness.calls(),
            vec![
                "connect",
                "open_session",
                "flush",
                "close_session",
                "close_connection"
            ]
        );
    }
}
