//! Schema and field type system
//!
//! A [`Schema`] owns the declared fields of a collection and the three
//! projections computed from them once at creation time:
//! - the search schema (every declared field),
//! - the facet schema (fields flagged `facet`),
//! - the sort schema (single-valued numeric fields).

mod field;

pub use field::{Field, FieldType};

use std::collections::HashMap;

/// Typed field declarations of a collection, with constant-time lookups.
///
/// Declaration order is retained so that validation walks fields in the
/// order they were declared, which keeps the first-failure error stable.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    fields: Vec<Field>,
    search_schema: HashMap<String, Field>,
    facet_schema: HashMap<String, Field>,
    sort_schema: HashMap<String, Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        let mut search_schema = HashMap::with_capacity(fields.len());
        let mut facet_schema = HashMap::new();
        let mut sort_schema = HashMap::new();

        for field in &fields {
            search_schema.insert(field.name.clone(), field.clone());

            if field.is_facet() {
                facet_schema.insert(field.name.clone(), field.clone());
            }

            if field.is_sortable() {
                sort_schema.insert(field.name.clone(), field.clone());
            }
        }

        Self {
            fields,
            search_schema,
            facet_schema,
            sort_schema,
        }
    }

    /// All declared fields, in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up any declared field
    pub fn search_field(&self, name: &str) -> Option<&Field> {
        self.search_schema.get(name)
    }

    /// Look up a faceted field
    pub fn facet_field(&self, name: &str) -> Option<&Field> {
        self.facet_schema.get(name)
    }

    /// Look up a sortable field
    pub fn sort_field(&self, name: &str) -> Option<&Field> {
        self.sort_schema.get(name)
    }

    /// Declared fields flagged as facets, in declaration order
    pub fn facet_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.is_facet()).collect()
    }

    /// Declared fields eligible for sorting, in declaration order
    pub fn sort_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.is_sortable()).collect()
    }

    /// Declared string-like fields, in declaration order
    pub fn string_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.field_type.is_string_like())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
