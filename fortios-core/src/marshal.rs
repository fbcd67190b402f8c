//! Marshaling - Flatten wire values into configuration values and expand them back
//!
//! These are the per-field primitives the reconciler and the object builder
//! are built from. Nested blocks reuse them recursively.

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::coerce::{self, ConversionError, json_type_name};
use crate::diagnostics::{Diagnostics, child_path};
use crate::resource::{Attributes, Value, WireObject};
use crate::schema::{BlockSchema, FieldSchema, FieldType, ScalarType};

/// A field that could not be converted to wire format
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field}': {cause}")]
pub struct FieldConversionError {
    /// Config path of the field (e.g., "srcaddr[0].name")
    pub field: String,
    pub cause: ConversionError,
}

impl FieldConversionError {
    pub fn new(field: impl Into<String>, cause: ConversionError) -> Self {
        Self {
            field: field.into(),
            cause,
        }
    }
}

fn mismatch(expected: &str, got: &Json) -> coerce::TypeMismatch {
    coerce::TypeMismatch {
        expected: expected.to_string(),
        got: json_type_name(got).to_string(),
    }
}

// =============================================================================
// Flatten (wire -> config)
// =============================================================================

/// Flatten one field's wire value.
///
/// Returns `None` when a scalar has the wrong wire type; the mismatch is
/// recorded in `diags` and the field should stay unset. List fields always
/// produce a (possibly empty) list.
pub fn flatten_field(
    wire: &Json,
    field: &FieldSchema,
    path: &str,
    diags: &mut Diagnostics,
) -> Option<Value> {
    match &field.field_type {
        FieldType::Scalar(scalar) => match coerce::to_config(wire, scalar) {
            Ok(v) => Some(v),
            Err(m) => {
                diags.type_mismatch(path, m);
                None
            }
        },
        FieldType::List(scalar) => Some(Value::List(flatten_scalar_list(
            wire, scalar, path, diags,
        ))),
        FieldType::Blocks(block) => Some(Value::List(flatten_list(wire, block, path, diags))),
    }
}

/// Flatten a wire array of scalars. `null` yields an empty list.
pub fn flatten_scalar_list(
    wire: &Json,
    scalar: &ScalarType,
    path: &str,
    diags: &mut Diagnostics,
) -> Vec<Value> {
    match wire {
        Json::Null => Vec::new(),
        Json::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match coerce::to_config(item, scalar) {
                Ok(v) => Some(v),
                Err(m) => {
                    diags.type_mismatch(format!("{}[{}]", path, i), m);
                    None
                }
            })
            .collect(),
        other => {
            diags.type_mismatch(path, mismatch("Array", other));
            Vec::new()
        }
    }
}

/// Flatten a wire array of objects into block values, preserving order.
///
/// `null` or an empty array yields an empty list. Elements that are not
/// objects are skipped with a diagnostic.
pub fn flatten_list(
    wire: &Json,
    block: &BlockSchema,
    path: &str,
    diags: &mut Diagnostics,
) -> Vec<Value> {
    match wire {
        Json::Null => Vec::new(),
        Json::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let item_path = format!("{}[{}]", path, i);
                match item {
                    Json::Object(obj) => {
                        Some(Value::Block(flatten_block(obj, block, &item_path, diags)))
                    }
                    other => {
                        diags.type_mismatch(item_path, mismatch("Object", other));
                        None
                    }
                }
            })
            .collect(),
        other => {
            diags.type_mismatch(path, mismatch("Array", other));
            Vec::new()
        }
    }
}

/// Flatten one block entry.
///
/// Unknown wire keys are ignored; expected keys missing from the wire object
/// take their zero value.
pub fn flatten_block(
    obj: &WireObject,
    block: &BlockSchema,
    path: &str,
    diags: &mut Diagnostics,
) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    for field in &block.fields {
        let wire = obj.get(&field.wire_name).unwrap_or(&Json::Null);
        let field_path = child_path(path, &field.name);
        if let Some(v) = flatten_field(wire, field, &field_path, diags) {
            fields.insert(field.name.clone(), v);
        }
    }
    fields
}

/// Flatten every top-level field present on the wire object
pub fn flatten_object(
    obj: &WireObject,
    fields: &[FieldSchema],
    diags: &mut Diagnostics,
) -> Attributes {
    let mut attributes = HashMap::new();
    for field in fields {
        if let Some(wire) = obj.get(&field.wire_name)
            && let Some(v) = flatten_field(wire, field, &field.name, diags)
        {
            attributes.insert(field.name.clone(), v);
        }
    }
    attributes
}

// =============================================================================
// Expand (config -> wire)
// =============================================================================

/// Expand one configuration value to wire format
pub fn expand_field(
    value: &Value,
    field: &FieldSchema,
    path: &str,
) -> Result<Json, FieldConversionError> {
    match &field.field_type {
        FieldType::Scalar(scalar) => expand_scalar(value, scalar, field.max_length, path),
        FieldType::List(scalar) => match value {
            Value::List(items) => expand_scalar_list(items, scalar, field.max_length, path),
            other => Err(type_error(path, &field.field_type.to_string(), other)),
        },
        FieldType::Blocks(block) => match value {
            Value::List(items) => expand_list(items, block, path),
            other => Err(type_error(path, "List<Block>", other)),
        },
    }
}

/// Expand a list of scalars to a wire array
pub fn expand_scalar_list(
    items: &[Value],
    scalar: &ScalarType,
    max_length: Option<usize>,
    path: &str,
) -> Result<Json, FieldConversionError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| expand_scalar(item, scalar, max_length, &format!("{}[{}]", path, i)))
        .collect::<Result<Vec<_>, _>>()
        .map(Json::Array)
}

/// Expand block entries to a wire array of objects.
///
/// Only sub-fields present in each entry are emitted; device-computed
/// sub-fields are never sent.
pub fn expand_list(
    items: &[Value],
    block: &BlockSchema,
    path: &str,
) -> Result<Json, FieldConversionError> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        let Value::Block(entry) = item else {
            return Err(type_error(&item_path, "Block", item));
        };

        let mut obj = WireObject::new();
        for field in block.fields.iter().filter(|f| f.is_settable()) {
            if let Some(value) = entry.get(&field.name) {
                let field_path = child_path(&item_path, &field.name);
                obj.insert(
                    field.wire_name.clone(),
                    expand_field(value, field, &field_path)?,
                );
            }
        }
        out.push(Json::Object(obj));
    }
    Ok(Json::Array(out))
}

fn expand_scalar(
    value: &Value,
    scalar: &ScalarType,
    max_length: Option<usize>,
    path: &str,
) -> Result<Json, FieldConversionError> {
    if let (Some(max), Value::String(s)) = (max_length, value) {
        let length = s.chars().count();
        if length > max {
            return Err(FieldConversionError::new(
                path,
                ConversionError::TooLong { length, max },
            ));
        }
    }
    coerce::to_wire(value, scalar).map_err(|cause| FieldConversionError::new(path, cause))
}

fn type_error(path: &str, expected: &str, got: &Value) -> FieldConversionError {
    FieldConversionError::new(
        path,
        ConversionError::Type {
            expected: expected.to_string(),
            got: got.type_name().to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use serde_json::json;

    fn address_block() -> BlockSchema {
        BlockSchema::names(79)
    }

    fn hosts_block() -> BlockSchema {
        BlockSchema::new()
            .field(FieldSchema::new("id", FieldType::int()))
            .field(FieldSchema::new("ip", FieldType::subnet()))
            .field(FieldSchema::new("ha_direct", FieldType::bool()))
            .keyed_by("id")
    }

    fn block(pairs: &[(&str, Value)]) -> Value {
        Value::Block(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn flatten_list_preserves_order() {
        let mut diags = Diagnostics::new();
        let wire = json!([{"name": "a1"}, {"name": "a2"}]);
        let list = flatten_list(&wire, &address_block(), "srcaddr", &mut diags);
        assert_eq!(
            list,
            vec![
                block(&[("name", Value::string("a1"))]),
                block(&[("name", Value::string("a2"))]),
            ]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn flatten_nil_and_empty_lists() {
        let mut diags = Diagnostics::new();
        assert!(flatten_list(&Json::Null, &address_block(), "x", &mut diags).is_empty());
        assert!(flatten_list(&json!([]), &address_block(), "x", &mut diags).is_empty());
        assert!(flatten_scalar_list(&Json::Null, &ScalarType::String, "x", &mut diags).is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn flatten_block_ignores_unknown_and_zero_fills_missing() {
        let mut diags = Diagnostics::new();
        let wire = json!([{"id": 3.0, "ip": "10.0.0.0 255.0.0.0", "q_origin_key": 3}]);
        let list = flatten_list(&wire, &hosts_block(), "hosts", &mut diags);
        assert_eq!(
            list,
            vec![block(&[
                ("id", Value::Int(3)),
                ("ip", Value::string("10.0.0.0/8")),
                ("ha_direct", Value::Bool(false)),
            ])]
        );
    }

    #[test]
    fn flatten_records_mismatch_and_skips_field() {
        let mut diags = Diagnostics::new();
        let wire = json!([{"id": "x", "ip": "10.0.0.0/8"}, "oops"]);
        let list = flatten_list(&wire, &hosts_block(), "hosts", &mut diags);
        assert_eq!(list.len(), 1);
        assert!(!list[0].as_block().unwrap().contains_key("id"));
        assert_eq!(diags.len(), 2);
        let paths: Vec<&str> = diags.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["hosts[0].id", "hosts[1]"]);
    }

    #[test]
    fn flatten_non_array_is_empty_with_diagnostic() {
        let mut diags = Diagnostics::new();
        let list = flatten_list(&json!("a1"), &address_block(), "srcaddr", &mut diags);
        assert!(list.is_empty());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn expand_list_emits_only_set_fields() {
        let items = vec![block(&[("id", Value::Int(1)), ("ip", Value::string("10.0.0.0/8"))])];
        let wire = expand_list(&items, &hosts_block(), "hosts").unwrap();
        assert_eq!(wire, json!([{"id": 1, "ip": "10.0.0.0 255.0.0.0"}]));
    }

    #[test]
    fn expand_enforces_max_length() {
        let items = vec![block(&[("name", Value::string("x".repeat(80)))])];
        let err = expand_list(&items, &address_block(), "srcaddr").unwrap_err();
        assert_eq!(err.field, "srcaddr[0].name");
        assert_eq!(
            err.cause,
            ConversionError::TooLong {
                length: 80,
                max: 79
            }
        );
    }

    #[test]
    fn expand_rejects_non_block_entries() {
        let err = expand_list(&[Value::string("a1")], &address_block(), "srcaddr").unwrap_err();
        assert_eq!(err.field, "srcaddr[0]");
    }

    #[test]
    fn flatten_expand_round_trip() {
        let field = FieldSchema::new("hosts", FieldType::blocks(hosts_block()));
        let value = Value::List(vec![
            block(&[
                ("id", Value::Int(1)),
                ("ip", Value::string("10.0.0.0/8")),
                ("ha_direct", Value::Bool(true)),
            ]),
            block(&[
                ("id", Value::Int(2)),
                ("ip", Value::string("192.168.0.0/16")),
                ("ha_direct", Value::Bool(false)),
            ]),
        ]);
        let wire = expand_field(&value, &field, "hosts").unwrap();
        let mut diags = Diagnostics::new();
        let back = flatten_field(&wire, &field, "hosts", &mut diags).unwrap();
        assert_eq!(back, value);
    }
}
