//! Index schema: free text plus one raw term field per facet.

use tantivy::schema::{Field, INDEXED, STORED, STRING, Schema, TEXT};

/// Identity of the indexed entity, used as the delete/update key.
pub const FIELD_IDENTITY: &str = "identity";
/// Entity kind discriminant, stored for result resolution.
pub const FIELD_KIND: &str = "kind";
/// Tokenized free-text field fed by the per-entity field visitor.
pub const FIELD_TEXT: &str = "text";
/// Raw facet terms for the units facet, one term per contributed value.
pub const FIELD_FACET_UNIT: &str = "facet_unit";

/// Cached handles to the schema's fields.
#[derive(Debug, Clone)]
pub struct SchemaFields {
    pub schema: Schema,
    pub identity: Field,
    pub kind: Field,
    pub text: Field,
    pub facet_unit: Field,
}

impl SchemaFields {
    pub fn new() -> Self {
        let mut builder = Schema::builder();
        let identity = builder.add_u64_field(FIELD_IDENTITY, INDEXED | STORED);
        let kind = builder.add_text_field(FIELD_KIND, STRING | STORED);
        let text = builder.add_text_field(FIELD_TEXT, TEXT);
        let facet_unit = builder.add_text_field(FIELD_FACET_UNIT, STRING);
        let schema = builder.build();
        Self {
            schema,
            identity,
            kind,
            text,
            facet_unit,
        }
    }
}

impl Default for SchemaFields {
    fn default() -> Self {
        Self::new()
    }
}
