//! Tantivy schema derived from an entity mapping.
//!
//! Every record index carries:
//! - doc_type: STRING | STORED - record type name
//! - doc_id: STRING | STORED - root primary key
//! - text: TEXT - all mapped values, for default-field queries
//!
//! plus one TEXT field per mapped column (STORED unless the mapping says
//! otherwise).

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use reindex_types::EntityMetadata;

use crate::error::SearchError;

/// Schema field handles for one record type.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    schema: Schema,
    pub doc_type: Field,
    pub doc_id: Field,
    pub text: Field,
    /// Mapped fields in mapping order
    pub fields: Vec<(String, Field)>,
}

impl RecordSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| *field)
    }

    /// Bind to the schema of an existing index, checking it carries every
    /// field the mapping needs.
    pub fn from_schema(schema: Schema, entity: &EntityMetadata) -> Result<Self, SearchError> {
        let lookup = |name: &str| {
            schema.get_field(name).map_err(|_| {
                SearchError::SchemaMismatch(format!("{}: missing {} field", entity.name, name))
            })
        };

        let doc_type = lookup("doc_type")?;
        let doc_id = lookup("doc_id")?;
        let text = lookup("text")?;
        let fields = entity
            .fields
            .iter()
            .map(|f| lookup(&f.name).map(|field| (f.name.clone(), field)))
            .collect::<Result<Vec<_>, _>>()?;

        let expected = 3 + entity.fields.len();
        let actual = schema.fields().count();
        if actual != expected {
            return Err(SearchError::SchemaMismatch(format!(
                "{}: index has {} fields, mapping needs {}",
                entity.name, actual, expected
            )));
        }

        Ok(Self {
            schema,
            doc_type,
            doc_id,
            text,
            fields,
        })
    }
}

/// Build the schema for one record type.
pub fn build_record_schema(entity: &EntityMetadata) -> RecordSchema {
    let mut schema_builder = Schema::builder();

    let doc_type = schema_builder.add_text_field("doc_type", STRING | STORED);
    let doc_id = schema_builder.add_text_field("doc_id", STRING | STORED);
    let text = schema_builder.add_text_field("text", TEXT);

    let fields = entity
        .fields
        .iter()
        .map(|f| {
            let field = if f.stored {
                schema_builder.add_text_field(&f.name, TEXT | STORED)
            } else {
                schema_builder.add_text_field(&f.name, TEXT)
            };
            (f.name.clone(), field)
        })
        .collect();

    RecordSchema {
        schema: schema_builder.build(),
        doc_type,
        doc_id,
        text,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> EntityMetadata {
        EntityMetadata::new("Customer", "customers")
            .with_field("name", "root.name")
            .with_field("email", "root.email")
    }

    #[test]
    fn test_build_schema() {
        let schema = build_record_schema(&customer());
        assert!(schema.schema().get_field("doc_type").is_ok());
        assert!(schema.schema().get_field("doc_id").is_ok());
        assert!(schema.schema().get_field("text").is_ok());
        assert!(schema.field("name").is_some());
        assert!(schema.field("email").is_some());
        assert!(schema.field("phone").is_none());
    }

    #[test]
    fn test_unstored_field() {
        let mut entity = customer();
        entity.fields[1].stored = false;
        let schema = build_record_schema(&entity);

        let email = schema.field("email").unwrap();
        assert!(!schema.schema().get_field_entry(email).is_stored());
    }

    #[test]
    fn test_from_schema() {
        let original = build_record_schema(&customer());
        let rebuilt = RecordSchema::from_schema(original.schema().clone(), &customer()).unwrap();
        assert_eq!(rebuilt.doc_id, original.doc_id);
        assert_eq!(rebuilt.field("email"), original.field("email"));
    }

    #[test]
    fn test_from_schema_detects_new_field() {
        let original = build_record_schema(&customer());
        let changed = customer().with_field("phone", "root.phone");

        let result = RecordSchema::from_schema(original.schema().clone(), &changed);
        assert!(matches!(result, Err(SearchError::SchemaMismatch(_))));
    }

    #[test]
    fn test_from_schema_detects_removed_field() {
        let original = build_record_schema(&customer());
        let mut changed = customer();
        changed.fields.pop();

        let result = RecordSchema::from_schema(original.schema().clone(), &changed);
        assert!(matches!(result, Err(SearchError::SchemaMismatch(_))));
    }
}
