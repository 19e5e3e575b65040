//! Schema validation of incoming documents.
//!
//! Runs before any shard or store mutation and never modifies the
//! document. Checks run in a fixed order (token-ranking field, then every
//! declared field in declaration order, then facet fields) and the first
//! failure wins, so callers can assert the specific rejection.

use serde_json::Value;

use crate::error::NacreError;
use crate::schema::{FieldType, Schema};
use crate::Result;

/// Validate `document` against the schema and the token-ranking contract.
pub fn validate_document(
    document: &Value,
    schema: &Schema,
    token_ranking_field: &str,
) -> Result<()> {
    if !token_ranking_field.is_empty() {
        validate_token_ranking_field(document, token_ranking_field)?;
    }

    for field in schema.fields() {
        let Some(value) = document.get(&field.name) else {
            return Err(NacreError::BadRequest(format!(
                "Field `{}` has been declared in the schema, but is not found in the document.",
                field.name
            )));
        };

        validate_field_type(&field.name, field.field_type, value)?;
    }

    for field in schema.fields().iter().filter(|f| f.is_facet()) {
        let Some(value) = document.get(&field.name) else {
            return Err(NacreError::BadRequest(format!(
                "Field `{}` has been declared as a facet field in the schema, \
                 but is not found in the document.",
                field.name
            )));
        };

        validate_facet_type(&field.name, field.field_type, value)?;
    }

    Ok(())
}

fn validate_token_ranking_field(document: &Value, field_name: &str) -> Result<()> {
    let Some(value) = document.get(field_name) else {
        return Err(NacreError::BadRequest(format!(
            "Field `{}` has been declared as a token ranking field, \
             but is not found in the document.",
            field_name
        )));
    };

    if !value.is_number() {
        return Err(NacreError::BadRequest(format!(
            "Token ranking field `{}` must be a number.",
            field_name
        )));
    }

    if value.is_f64() {
        if value.as_f64().unwrap_or(0.0).abs() > f32::MAX as f64 {
            return Err(NacreError::BadRequest(format!(
                "Token ranking field `{}` exceeds maximum value of a float.",
                field_name
            )));
        }
    } else if value.as_i64().map_or(true, |v| v > i32::MAX as i64) {
        return Err(NacreError::BadRequest(format!(
            "Token ranking field `{}` exceeds maximum value of int32.",
            field_name
        )));
    }

    Ok(())
}

fn validate_field_type(field_name: &str, field_type: FieldType, value: &Value) -> Result<()> {
    let error = |message: String| Err(NacreError::BadRequest(message));

    match field_type {
        FieldType::String => {
            if !value.is_string() {
                return error(format!("Field `{}` must be a string.", field_name));
            }
        }
        FieldType::Int32 => {
            if !value.is_i64() && !value.is_u64() {
                return error(format!("Field `{}` must be an int32.", field_name));
            }
            if value.as_i64().map_or(true, |v| v > i32::MAX as i64) {
                return error(format!(
                    "Field `{}` exceeds maximum value of int32.",
                    field_name
                ));
            }
        }
        FieldType::Int64 => {
            if !value.is_i64() && !value.is_u64() {
                return error(format!("Field `{}` must be an int64.", field_name));
            }
            // u64 values past i64::MAX cannot be stored
            if value.as_i64().is_none() {
                return error(format!(
                    "Field `{}` exceeds maximum value of int64.",
                    field_name
                ));
            }
        }
        FieldType::Float => {
            // An integer may be passed to a float field
            if !value.is_number() {
                return error(format!("Field `{}` must be a float.", field_name));
            }
        }
        FieldType::StringArray => {
            if !is_array_of(value, Value::is_string) {
                return error(format!("Field `{}` must be a string array.", field_name));
            }
        }
        FieldType::Int32Array => {
            if !is_array_of(value, |v| v.as_i64().is_some()) {
                return error(format!("Field `{}` must be an int32 array.", field_name));
            }
        }
        FieldType::Int64Array => {
            if !is_array_of(value, |v| v.as_i64().is_some()) {
                return error(format!("Field `{}` must be an int64 array.", field_name));
            }
        }
        FieldType::FloatArray => {
            if !is_array_of(value, Value::is_f64) {
                return error(format!("Field `{}` must be a float array.", field_name));
            }
        }
    }

    Ok(())
}

// Array element types are checked by sampling the first element only.
fn is_array_of(value: &Value, check: impl Fn(&Value) -> bool) -> bool {
    match value.as_array() {
        Some(elements) => elements.first().map_or(true, check),
        None => false,
    }
}

fn validate_facet_type(field_name: &str, field_type: FieldType, value: &Value) -> Result<()> {
    match field_type {
        FieldType::String => {
            if !value.is_string() {
                return Err(NacreError::BadRequest(format!(
                    "Facet field `{}` must be a string.",
                    field_name
                )));
            }
        }
        FieldType::StringArray => {
            if !is_array_of(value, Value::is_string) {
                return Err(NacreError::BadRequest(format!(
                    "Facet field `{}` must be a string array.",
                    field_name
                )));
            }
        }
        _ => {
            return Err(NacreError::BadRequest(format!(
                "Facet field `{}` must be a string or a string[].",
                field_name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::string("title"),
            Field::int32("year"),
            Field::float("price"),
            Field::string_array("tags").faceted(),
        ])
    }

    fn expect_rejection(doc: Value, message: &str) {
        let err = validate_document(&doc, &schema(), "").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_valid_document() {
        let doc = json!({"title": "red shoe", "year": 2020, "price": 9.5, "tags": ["sale"]});
        assert!(validate_document(&doc, &schema(), "").is_ok());
    }

    #[test]
    fn test_missing_field() {
        expect_rejection(
            json!({"year": 2020, "price": 9.5, "tags": []}),
            "Field `title` has been declared in the schema, but is not found in the document.",
        );
    }

    #[test]
    fn test_wrong_scalar_types() {
        expect_rejection(
            json!({"title": 3, "year": 2020, "price": 9.5, "tags": []}),
            "Field `title` must be a string.",
        );
        expect_rejection(
            json!({"title": "x", "year": "2020", "price": 9.5, "tags": []}),
            "Field `year` must be an int32.",
        );
        expect_rejection(
            json!({"title": "x", "year": 2020, "price": "cheap", "tags": []}),
            "Field `price` must be a float.",
        );
    }

    #[test]
    fn test_int32_range() {
        expect_rejection(
            json!({"title": "x", "year": 3_000_000_000_i64, "price": 1.0, "tags": []}),
            "Field `year` exceeds maximum value of int32.",
        );
    }

    #[test]
    fn test_int64_overflow_rejected() {
        let schema = Schema::new(vec![Field::int64("views"), Field::new("ids", FieldType::Int64Array)]);

        let doc = json!({"views": 18_446_744_073_709_551_615_u64, "ids": [1]});
        let err = validate_document(&doc, &schema, "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field `views` exceeds maximum value of int64."
        );

        let doc = json!({"views": 1, "ids": [18_446_744_073_709_551_615_u64]});
        let err = validate_document(&doc, &schema, "").unwrap_err();
        assert_eq!(err.to_string(), "Field `ids` must be an int64 array.");

        let doc = json!({"views": i64::MAX, "ids": [i64::MAX]});
        assert!(validate_document(&doc, &schema, "").is_ok());
    }

    #[test]
    fn test_integer_accepted_for_float_field() {
        let doc = json!({"title": "x", "year": 1, "price": 10, "tags": []});
        assert!(validate_document(&doc, &schema(), "").is_ok());
    }

    #[test]
    fn test_array_sampling_checks_first_element_only() {
        // Heterogeneous tail is accepted: only element 0 is sampled.
        let doc = json!({"title": "x", "year": 1, "price": 1.0, "tags": ["ok", 5]});
        assert!(validate_document(&doc, &schema(), "").is_ok());

        expect_rejection(
            json!({"title": "x", "year": 1, "price": 1.0, "tags": [5, "ok"]}),
            "Field `tags` must be a string array.",
        );
        expect_rejection(
            json!({"title": "x", "year": 1, "price": 1.0, "tags": "solo"}),
            "Field `tags` must be a string array.",
        );
    }

    #[test]
    fn test_empty_array_is_valid() {
        let doc = json!({"title": "x", "year": 1, "price": 1.0, "tags": []});
        assert!(validate_document(&doc, &schema(), "").is_ok());
    }

    #[test]
    fn test_numeric_facet_field_rejected() {
        let schema = Schema::new(vec![Field::int32("ratings").faceted()]);
        let doc = json!({"ratings": 5});
        let err = validate_document(&doc, &schema, "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Facet field `ratings` must be a string or a string[]."
        );
    }

    #[test]
    fn test_token_ranking_field_checks() {
        let schema = schema();

        let err = validate_document(&json!({"title": "x"}), &schema, "popularity").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field `popularity` has been declared as a token ranking field, \
             but is not found in the document."
        );

        let doc = json!({"title": "x", "year": 1, "price": 1.0, "tags": [], "popularity": "high"});
        let err = validate_document(&doc, &schema, "popularity").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Token ranking field `popularity` must be a number."
        );

        let doc = json!({"title": "x", "year": 1, "price": 1.0, "tags": [],
                         "popularity": 5_000_000_000_i64});
        let err = validate_document(&doc, &schema, "popularity").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Token ranking field `popularity` exceeds maximum value of int32."
        );

        let doc = json!({"title": "x", "year": 1, "price": 1.0, "tags": [], "popularity": 2.5});
        assert!(validate_document(&doc, &schema, "popularity").is_ok());
    }

    #[test]
    fn test_validation_order_is_declaration_order() {
        // Both title and year are wrong: the first declared field wins.
        let doc = json!({"title": 1, "year": "x", "price": 1.0, "tags": []});
        let err = validate_document(&doc, &schema(), "").unwrap_err();
        assert_eq!(err.to_string(), "Field `title` must be a string.");
    }
}
