//! Document mapping from record instances to Tantivy documents.

use tantivy::TantivyDocument;

use reindex_types::RecordInstance;

use crate::schema::RecordSchema;

/// Convert a record to a Tantivy document.
///
/// Every value of a mapped field is added (multi-valued fields come from
/// collapsed joins) and also copied into the catch-all `text` field. Values
/// for fields the schema does not know are dropped.
pub fn record_to_doc(schema: &RecordSchema, record: &RecordInstance) -> TantivyDocument {
    let mut doc = TantivyDocument::default();
    doc.add_text(schema.doc_type, record.record_type());
    doc.add_text(schema.doc_id, record.id());

    for (name, value) in record.fields() {
        if let Some(field) = schema.field(name) {
            doc.add_text(field, value);
            doc.add_text(schema.text, value);
        }
    }

    doc
}
