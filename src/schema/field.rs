//! Field declarations
//!
//! A collection's schema is a flat list of typed fields. The type decides
//! how a field is validated on ingest, and whether it can participate in
//! full-text search, faceting and sorting.

use serde::{Deserialize, Serialize};

/// Field data type
///
/// The closed set of types a declared field may take. Scalar numeric types
/// are sortable; string-like types are searchable and facetable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "int32[]")]
    Int32Array,
    #[serde(rename = "int64[]")]
    Int64Array,
    #[serde(rename = "float[]")]
    FloatArray,
}

impl FieldType {
    /// Check if this type can back a full-text query field
    pub fn is_string_like(&self) -> bool {
        matches!(self, FieldType::String | FieldType::StringArray)
    }

    /// Check if this type can back a sort field (single numeric values only)
    pub fn is_sortable(&self) -> bool {
        matches!(self, FieldType::Int32 | FieldType::Int64 | FieldType::Float)
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            FieldType::StringArray
                | FieldType::Int32Array
                | FieldType::Int64Array
                | FieldType::FloatArray
        )
    }

    /// The schema wire name for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float => "float",
            FieldType::StringArray => "string[]",
            FieldType::Int32Array => "int32[]",
            FieldType::Int64Array => "int64[]",
            FieldType::FloatArray => "float[]",
        }
    }
}

/// A declared schema field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub facet: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            facet: false,
        }
    }

    /// Create a `string` field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Create a `string[]` field
    pub fn string_array(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::StringArray)
    }

    /// Create an `int32` field
    pub fn int32(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int32)
    }

    /// Create an `int64` field
    pub fn int64(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int64)
    }

    /// Create a `float` field
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Mark this field as faceted
    pub fn faceted(mut self) -> Self {
        self.facet = true;
        self
    }

    pub fn is_facet(&self) -> bool {
        self.facet
    }

    pub fn is_sortable(&self) -> bool {
        self.field_type.is_sortable()
    }
}
