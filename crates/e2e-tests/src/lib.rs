//! End-to-end test infrastructure for search-reindex.
//!
//! Provides a shared TestHarness with a seeded SQLite store, a mapping file
//! and an index directory, plus helpers to query the index a run produced.

use std::path::PathBuf;

use rusqlite::{params, Connection};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{Index, TantivyDocument};

use reindex_types::Settings;

/// Customer (joined to orders, soft-deletable), Order, Invoice and a
/// non-searchable AuditLog.
pub const DEFAULT_MAPPING: &str = r#"
[[entity]]
name = "Customer"
table = "customers"
searchable = true
live_filter = "root.deleted_at IS NULL"
joins = ["LEFT JOIN orders o ON o.customer_id = root.id"]

[[entity.field]]
name = "name"
column = "root.name"

[[entity.field]]
name = "email"
column = "root.email"

[[entity.field]]
name = "order_ref"
column = "o.reference"

[[entity]]
name = "AuditLog"
table = "audit_log"

[[entity.field]]
name = "action"
column = "root.action"

[[entity]]
name = "Order"
table = "orders"
searchable = true

[[entity.field]]
name = "reference"
column = "root.reference"

[[entity]]
name = "Invoice"
table = "invoices"
searchable = true

[[entity.field]]
name = "number"
column = "root.number"
"#;

const SCHEMA: &str = "
CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT, email TEXT, deleted_at TEXT);
CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, reference TEXT);
CREATE TABLE invoices (id INTEGER PRIMARY KEY, number TEXT);
CREATE TABLE audit_log (id INTEGER PRIMARY KEY, action TEXT);
";

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Index base directory (not created up front)
    pub index_dir: PathBuf,
    /// Mapping file
    pub mapping_path: PathBuf,
}

impl TestHarness {
    /// Create a harness with an empty schema and the default mapping.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("app.db");
        let index_dir = temp_dir.path().join("index");
        let mapping_path = temp_dir.path().join("search-mapping.toml");

        let conn = Connection::open(&db_path).expect("Failed to create test database");
        conn.execute_batch(SCHEMA).expect("Failed to create schema");

        let harness = Self {
            _temp_dir: temp_dir,
            db_path,
            index_dir,
            mapping_path,
        };
        harness.write_mapping(DEFAULT_MAPPING);
        harness
    }

    /// Harness seeded with three customers (one with two orders), two
    /// invoices and audit rows.
    pub fn seeded() -> Self {
        let harness = Self::new();
        harness.insert_customer(1, "Ada Lovelace", "ada@example.com");
        harness.insert_customer(2, "Grace Hopper", "grace@example.com");
        harness.insert_customer(3, "Alan Turing", "alan@example.com");
        harness.insert_order(10, 1, "ORD-ENGINE");
        harness.insert_order(11, 1, "ORD-NOTES");
        harness.insert_order(12, 2, "ORD-COBOL");
        harness.insert_invoice(100, "INV-100");
        harness.insert_invoice(101, "INV-101");
        harness.insert_audit(1, "login");
        harness.insert_audit(2, "logout");
        harness
    }

    pub fn write_mapping(&self, mapping: &str) {
        std::fs::write(&self.mapping_path, mapping).expect("Failed to write mapping");
    }

    fn connection(&self) -> Connection {
        Connection::open(&self.db_path).expect("Failed to open test database")
    }

    pub fn insert_customer(&self, id: i64, name: &str, email: &str) {
        self.connection()
            .execute(
                "INSERT INTO customers (id, name, email) VALUES (?1, ?2, ?3)",
                params![id, name, email],
            )
            .expect("Failed to insert customer");
    }

    pub fn soft_delete_customer(&self, id: i64) {
        self.connection()
            .execute(
                "UPDATE customers SET deleted_at = '2024-01-01' WHERE id = ?1",
                params![id],
            )
            .expect("Failed to delete customer");
    }

    pub fn insert_order(&self, id: i64, customer_id: i64, reference: &str) {
        self.connection()
            .execute(
                "INSERT INTO orders (id, customer_id, reference) VALUES (?1, ?2, ?3)",
                params![id, customer_id, reference],
            )
            .expect("Failed to insert order");
    }

    pub fn insert_invoice(&self, id: i64, number: &str) {
        self.connection()
            .execute(
                "INSERT INTO invoices (id, number) VALUES (?1, ?2)",
                params![id, number],
            )
            .expect("Failed to insert invoice");
    }

    pub fn insert_audit(&self, id: i64, action: &str) {
        self.connection()
            .execute(
                "INSERT INTO audit_log (id, action) VALUES (?1, ?2)",
                params![id, action],
            )
            .expect("Failed to insert audit row");
    }

    /// Settings pointing at this harness.
    pub fn settings(&self) -> Settings {
        Settings {
            url: format!("sqlite://{}", self.db_path.display()),
            index_dir: self.index_dir.to_string_lossy().to_string(),
            mapping: self.mapping_path.to_string_lossy().to_string(),
            writer_memory_mb: 15,
            fetch_size: 2,
            ..Default::default()
        }
    }

    /// Entry names directly under the index directory, sorted.
    pub fn index_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.index_dir)
            .expect("Failed to list index directory")
            .map(|e| {
                e.expect("Failed to read entry")
                    .file_name()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        names.sort();
        names
    }

    /// Documents in one partition.
    pub fn doc_count(&self, partition: &str) -> u64 {
        let index =
            Index::open_in_dir(self.index_dir.join(partition)).expect("Failed to open index");
        index
            .reader()
            .expect("Failed to open reader")
            .searcher()
            .num_docs()
    }

    /// Sorted ids of documents in `partition` matching `query` on the
    /// catch-all text field.
    pub fn search_ids(&self, partition: &str, query: &str) -> Vec<String> {
        let index =
            Index::open_in_dir(self.index_dir.join(partition)).expect("Failed to open index");
        let schema = index.schema();
        let text = schema.get_field("text").expect("text field");
        let doc_id = schema.get_field("doc_id").expect("doc_id field");

        let searcher = index.reader().expect("Failed to open reader").searcher();
        let query = QueryParser::for_index(&index, vec![text])
            .parse_query(query)
            .expect("Failed to parse query");
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(100))
            .expect("Search failed");

        let mut ids: Vec<String> = top_docs
            .into_iter()
            .map(|(_, address)| {
                let doc: TantivyDocument = searcher.doc(address).expect("Failed to load doc");
                doc.get_first(doc_id)
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_default()
            })
            .collect();
        ids.sort();
        ids
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
