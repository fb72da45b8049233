//! Record source: lazy, distinct reads of every live instance of a type.
//!
//! Pages are selected by root id (keyset pagination), so every row a join
//! produces for a root lands in the same page and can be folded into a
//! single [`RecordInstance`].

use std::collections::VecDeque;

use rusqlite::types::Value;
use rusqlite::{params, Connection};
use tracing::{debug, warn};

use reindex_types::{RecordInstance, RecordType};

use crate::connection::SqliteConnector;
use crate::error::StoreError;

/// Lazy sequence of records for one type. Not restartable.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<RecordInstance, StoreError>> + 'a>;

/// Read-only access to the store over a single connection.
pub trait RecordSource {
    /// Start the read transaction for a type.
    fn begin_read(&mut self, record_type: &RecordType) -> Result<(), StoreError>;

    /// Every live instance of `record_type`, each root exactly once.
    ///
    /// Calling it again re-executes the read.
    fn fetch_all(&mut self, record_type: &RecordType) -> Result<RecordStream<'_>, StoreError>;

    /// End the read transaction started by [`RecordSource::begin_read`].
    fn end_read(&mut self) -> Result<(), StoreError>;

    /// Release the connection, rolling back any open transaction.
    fn close(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

/// Opens the single connection a run reads through.
pub trait StoreConnector {
    type Source: RecordSource;

    fn connect(&self) -> Result<Self::Source, StoreError>;
}

impl StoreConnector for SqliteConnector {
    type Source = SqliteRecordSource;

    fn connect(&self) -> Result<SqliteRecordSource, StoreError> {
        let conn = self.open()?;
        Ok(SqliteRecordSource::new(conn, self.settings().fetch_size))
    }
}

/// [`RecordSource`] over a read-only SQLite connection.
pub struct SqliteRecordSource {
    conn: Connection,
    fetch_size: usize,
}

impl SqliteRecordSource {
    pub fn new(conn: Connection, fetch_size: usize) -> Self {
        Self {
            conn,
            fetch_size: fetch_size.max(1),
        }
    }

    /// Whether a read transaction is open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

impl RecordSource for SqliteRecordSource {
    fn begin_read(&mut self, record_type: &RecordType) -> Result<(), StoreError> {
        if self.in_transaction() {
            warn!(record_type = %record_type, "Read transaction still open; rolling back");
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.conn.execute_batch("BEGIN DEFERRED")?;
        debug!(record_type = %record_type, "Began read transaction");
        Ok(())
    }

    fn fetch_all(&mut self, record_type: &RecordType) -> Result<RecordStream<'_>, StoreError> {
        let queries = PageQueries::build(record_type)?;
        // Surface mapping mismatches (unknown table/column) before the first row.
        self.conn.prepare_cached(&queries.ids)?;
        self.conn.prepare_cached(&queries.rows)?;

        let field_names = record_type
            .metadata()
            .fields
            .iter()
            .map(|f| f.name.clone())
            .collect();

        Ok(Box::new(PagedRecords {
            conn: &self.conn,
            queries,
            record_type: record_type.name().to_string(),
            field_names,
            fetch_size: self.fetch_size,
            cursor: Value::Null,
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }

    fn end_read(&mut self) -> Result<(), StoreError> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn close(self) -> Result<(), StoreError> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        debug!("Closed store connection");
        Ok(())
    }
}

/// The two statements behind one page.
///
/// `ids` selects the page's root ids on the root table alone and decides
/// paging; `rows` re-selects those roots through the mapped joins. Joins can
/// drop or multiply rows, so they never feed the cursor. Both take `?1` (the
/// last root id of the previous page, NULL for the first) and `?2` (root ids
/// per page).
struct PageQueries {
    ids: String,
    rows: String,
}

impl PageQueries {
    fn build(record_type: &RecordType) -> Result<Self, StoreError> {
        let meta = record_type.metadata();
        if meta.is_abstract() {
            return Err(StoreError::Unmappable(record_type.name().to_string()));
        }
        let table = meta.table.as_deref().unwrap_or_default().trim();
        let id = meta.id_column.trim();

        let mut columns = vec![format!("root.{id}")];
        columns.extend(meta.fields.iter().map(|f| f.column.clone()));

        let mut filter = format!("root.{id} IS NOT NULL AND (?1 IS NULL OR root.{id} > ?1)");
        if let Some(live) = meta.live_filter.as_deref().filter(|f| !f.trim().is_empty()) {
            filter.push_str(&format!(" AND ({live})"));
        }

        let ids = format!(
            "SELECT root.{id} FROM {table} AS root WHERE {filter} ORDER BY root.{id} LIMIT ?2"
        );
        let rows = format!(
            "SELECT {columns} FROM {table} AS root {joins} WHERE root.{id} IN ({ids}) \
             ORDER BY root.{id}",
            columns = columns.join(", "),
            joins = meta.joins.join(" "),
        );
        Ok(Self { ids, rows })
    }
}

/// Render a SQL value as index text; `None` for NULL and binary values.
fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(s) => Some(s),
    }
}

/// Render a root id as the document id. Binary keys become lowercase hex so
/// distinct keys never share a document.
fn id_text(record_type: &str, value: &Value) -> Result<String, StoreError> {
    match value {
        Value::Integer(i) => Ok(i.to_string()),
        Value::Real(r) => Ok(r.to_string()),
        Value::Text(s) => Ok(s.clone()),
        Value::Blob(bytes) => Ok(bytes.iter().map(|b| format!("{b:02x}")).collect()),
        Value::Null => Err(StoreError::Mapping(format!(
            "type '{record_type}' produced a row without an id"
        ))),
    }
}

struct PagedRecords<'a> {
    conn: &'a Connection,
    queries: PageQueries,
    record_type: String,
    field_names: Vec<String>,
    fetch_size: usize,
    cursor: Value,
    buffer: VecDeque<RecordInstance>,
    exhausted: bool,
}

impl PagedRecords<'_> {
    fn fetch_page(&mut self) -> Result<(), StoreError> {
        let page_ids: Vec<Value> = {
            let mut stmt = self.conn.prepare_cached(&self.queries.ids)?;
            let ids = stmt.query_map(params![self.cursor, self.fetch_size as i64], |row| {
                row.get(0)
            })?;
            ids.collect::<Result<_, _>>()?
        };
        let Some(last_root) = page_ids.last().cloned() else {
            self.exhausted = true;
            return Ok(());
        };

        let mut roots = 0usize;
        {
            let mut stmt = self.conn.prepare_cached(&self.queries.rows)?;
            let mut rows = stmt.query(params![self.cursor, self.fetch_size as i64])?;
            let mut last_id: Option<Value> = None;

            while let Some(row) = rows.next()? {
                let id: Value = row.get(0)?;
                let mut record = RecordInstance::new(
                    self.record_type.as_str(),
                    id_text(&self.record_type, &id)?,
                );
                for (i, name) in self.field_names.iter().enumerate() {
                    if let Some(text) = value_text(row.get(i + 1)?) {
                        record.add_value(name, text);
                    }
                }

                match (&last_id, self.buffer.back_mut()) {
                    (Some(prev), Some(current)) if *prev == id => current.merge(record),
                    _ => {
                        self.buffer.push_back(record);
                        roots += 1;
                    }
                }
                last_id = Some(id);
            }
        }

        if page_ids.len() < self.fetch_size {
            self.exhausted = true;
        } else {
            self.cursor = last_root;
        }
        debug!(
            record_type = %self.record_type,
            page_roots = page_ids.len(),
            roots,
            "Fetched page"
        );
        Ok(())
    }
}

impl Iterator for PagedRecords<'_> {
    type Item = Result<RecordInstance, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        // A page can yield no records when joins drop all of its roots.
        while self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
