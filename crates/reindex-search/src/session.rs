//! Index writing sessions.
//!
//! A session owns one writer per partition of the type being indexed.
//! Staged documents stay invisible until `flush`: `commit_batch` only closes
//! the batch and parks its writers until the single durable commit at the
//! end of the run.

use std::collections::VecDeque;

use tantivy::{Index, IndexWriter, Term};
use tracing::{debug, info, warn};

use reindex_types::{IndexTarget, RecordInstance, RecordType};

use crate::document::record_to_doc;
use crate::error::SearchError;
use crate::index::{DirectoryProvider, SearchIndexConfig};
use crate::schema::RecordSchema;

/// Opaque handle for the batch of one record type.
#[derive(Debug, PartialEq, Eq)]
pub struct BatchHandle {
    record_type: String,
    id: u64,
}

impl BatchHandle {
    /// `id` distinguishes successive batches of the same session.
    pub fn new(record_type: impl Into<String>, id: u64) -> Self {
        Self {
            record_type: record_type.into(),
            id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }
}

/// Write access to the full-text index for one run.
pub trait IndexSession {
    /// Physical partitions a type writes to.
    fn targets(&self, record_type: &RecordType) -> Vec<IndexTarget>;

    /// Open a batch for one type. Only one batch may be open at a time.
    fn begin_batch(&mut self, record_type: &RecordType) -> Result<BatchHandle, SearchError>;

    /// Add or replace one record in the open batch.
    fn stage(&mut self, batch: &BatchHandle, record: &RecordInstance) -> Result<(), SearchError>;

    /// Close the batch. Returns the number of staged records.
    fn commit_batch(&mut self, batch: BatchHandle) -> Result<u64, SearchError>;

    /// Durably persist every committed batch. Calling it again is a no-op.
    fn flush(&mut self) -> Result<u64, SearchError>;

    /// Discard any open batch and release every writer.
    fn close(self) -> Result<(), SearchError>
    where
        Self: Sized;
}

/// Opens index sessions.
pub trait IndexBackend {
    type Session: IndexSession;

    fn open_session(&self, config: &SearchIndexConfig) -> Result<Self::Session, SearchError>;
}

/// Tantivy-backed sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TantivyBackend;

impl IndexBackend for TantivyBackend {
    type Session = TantivySession;

    fn open_session(&self, config: &SearchIndexConfig) -> Result<TantivySession, SearchError> {
        TantivySession::open(config.clone())
    }
}

/// One partition with a live writer.
struct Partition {
    target: IndexTarget,
    index: Index,
    schema: RecordSchema,
    writer: IndexWriter,
    staged: u64,
}

struct OpenBatch {
    id: u64,
    record_type: String,
    partitions: Vec<Partition>,
}

/// Session writing one Tantivy index per partition.
pub struct TantivySession {
    config: SearchIndexConfig,
    open: Option<OpenBatch>,
    pending: VecDeque<Partition>,
    flushed: Vec<(IndexTarget, Index)>,
    next_batch: u64,
}

impl TantivySession {
    pub fn open(config: SearchIndexConfig) -> Result<Self, SearchError> {
        if config.provider == DirectoryProvider::Filesystem && !config.index_base.is_dir() {
            return Err(SearchError::DirectoryMissing(config.index_base));
        }
        info!(
            index_base = ?config.index_base,
            provider = config.provider.as_str(),
            "Opened index session"
        );
        Ok(Self {
            config,
            open: None,
            pending: VecDeque::new(),
            flushed: Vec::new(),
            next_batch: 0,
        })
    }

    /// Documents visible for a type after flush.
    pub fn num_docs(&self, record_type: &str) -> Result<u64, SearchError> {
        let mut total = 0;
        for (target, index) in &self.flushed {
            if target.record_type == record_type {
                total += index.reader()?.searcher().num_docs();
            }
        }
        Ok(total)
    }

    fn open_batch(&mut self, batch: &BatchHandle) -> Result<&mut OpenBatch, SearchError> {
        match self.open.as_mut() {
            Some(open) if open.id == batch.id => Ok(open),
            _ => Err(SearchError::UnknownBatch(batch.record_type.clone())),
        }
    }

    fn flush_one(&mut self, partition: Partition) -> Result<u64, SearchError> {
        let Partition {
            target,
            index,
            mut writer,
            staged,
            ..
        } = partition;
        writer.commit()?;
        writer.wait_merging_threads()?;
        debug!(target = %target, staged, "Flushed partition");
        self.flushed.push((target, index));
        Ok(staged)
    }
}

impl IndexSession for TantivySession {
    fn targets(&self, record_type: &RecordType) -> Vec<IndexTarget> {
        self.config.targets(record_type.metadata())
    }

    fn begin_batch(&mut self, record_type: &RecordType) -> Result<BatchHandle, SearchError> {
        if let Some(open) = &self.open {
            return Err(SearchError::BatchInProgress(open.record_type.clone()));
        }

        let entity = record_type.metadata();
        let mut partitions = Vec::new();
        for target in self.config.targets(entity) {
            let (index, schema) = self.config.open_partition(entity, &target)?;
            let writer = self.config.writer(&index)?;
            // A batch replaces the partition contents wholesale.
            writer.delete_all_documents()?;
            partitions.push(Partition {
                target,
                index,
                schema,
                writer,
                staged: 0,
            });
        }

        self.next_batch += 1;
        let handle = BatchHandle::new(record_type.name(), self.next_batch);
        debug!(
            record_type = %record_type,
            partitions = partitions.len(),
            "Began batch"
        );
        self.open = Some(OpenBatch {
            id: handle.id,
            record_type: handle.record_type.clone(),
            partitions,
        });
        Ok(handle)
    }

    fn stage(&mut self, batch: &BatchHandle, record: &RecordInstance) -> Result<(), SearchError> {
        let open = self.open_batch(batch)?;
        let shard = shard_for(record.id(), open.partitions.len());
        let partition = &mut open.partitions[shard];

        let doc = record_to_doc(&partition.schema, record);
        partition
            .writer
            .delete_term(Term::from_field_text(partition.schema.doc_id, record.id()));
        partition.writer.add_document(doc)?;
        partition.staged += 1;
        Ok(())
    }

    fn commit_batch(&mut self, batch: BatchHandle) -> Result<u64, SearchError> {
        self.open_batch(&batch)?;
        let Some(open) = self.open.take() else {
            return Err(SearchError::UnknownBatch(batch.record_type));
        };

        let staged: u64 = open.partitions.iter().map(|p| p.staged).sum();
        self.pending.extend(open.partitions);
        info!(record_type = %open.record_type, staged, "Committed batch");
        Ok(staged)
    }

    fn flush(&mut self) -> Result<u64, SearchError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let mut flushed = 0;
        while let Some(partition) = self.pending.pop_front() {
            flushed += self.flush_one(partition)?;
        }
        info!(documents = flushed, "Flushed index");
        Ok(flushed)
    }

    fn close(mut self) -> Result<(), SearchError> {
        if let Some(open) = self.open.take() {
            warn!(record_type = %open.record_type, "Discarding uncommitted batch");
            for mut partition in open.partitions {
                partition.writer.rollback()?;
            }
        }
        if !self.pending.is_empty() {
            self.flush()?;
        }
        debug!("Closed index session");
        Ok(())
    }
}

/// Stable partition for a record id (FNV-1a).
pub fn shard_for(id: &str, shards: usize) -> usize {
    if shards <= 1 {
        return 0;
    }
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % shards as u64) as usize
}
