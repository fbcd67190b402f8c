//! Builder - Turn configuration state into outbound wire objects
//!
//! Only fields present in the configuration are sent. A field the user never
//! set is omitted rather than sent as its zero value, so the device keeps its
//! own default. The one exception is the update path: a field that was set
//! before and has been removed is sent as an explicit clear.

use serde_json::Value as Json;

use crate::capability::Capabilities;
use crate::coerce::ConversionError;
use crate::marshal::{self, FieldConversionError};
use crate::resource::{Attributes, WireObject};
use crate::schema::{FieldSchema, ResourceSchema};

/// Build the body of a create request
pub fn build_object(
    schema: &ResourceSchema,
    config: &Attributes,
    caps: &Capabilities,
) -> Result<WireObject, FieldConversionError> {
    let mut obj = WireObject::new();

    for field in schema.fields.iter().filter(|f| f.is_settable()) {
        let Some(value) = config.get(&field.name) else {
            continue;
        };
        if !caps.supports(&schema.resource_type, &field.name) {
            let range = caps
                .range(&schema.resource_type, &field.name)
                .unwrap_or_default();
            return Err(FieldConversionError::new(
                &field.name,
                ConversionError::Unsupported(format!("requires FortiOS {}", range)),
            ));
        }
        let wire = marshal::expand_field(value, field, &field.name)?;
        obj.insert(field.wire_name.clone(), wire);
    }

    for name in config.keys() {
        if schema.get(name).is_none() {
            log::debug!("{}: ignoring unknown attribute '{}'", schema.resource_type, name);
        }
    }

    Ok(obj)
}

/// Build the body of an update request.
///
/// Fields that hold a non-empty value in `prior` but are absent from
/// `config` are cleared explicitly.
pub fn build_update(
    schema: &ResourceSchema,
    config: &Attributes,
    prior: &Attributes,
    caps: &Capabilities,
) -> Result<WireObject, FieldConversionError> {
    let mut obj = build_object(schema, config, caps)?;

    for field in schema.fields.iter().filter(|f| f.is_settable()) {
        if config.contains_key(&field.name) || schema.mkey.as_deref() == Some(field.name.as_str()) {
            continue;
        }
        let was_set = prior.get(&field.name).is_some_and(|v| !v.is_empty());
        if !was_set {
            continue;
        }
        if !caps.supports(&schema.resource_type, &field.name) {
            log::debug!(
                "{}: not clearing '{}', unsupported by device firmware",
                schema.resource_type,
                field.name
            );
            continue;
        }
        log::debug!("{}: clearing '{}'", schema.resource_type, field.name);
        obj.insert(field.wire_name.clone(), cleared(field));
    }

    Ok(obj)
}

/// Build an update body that clears every settable field, restoring a
/// global setting to its device defaults
pub fn build_reset(schema: &ResourceSchema) -> WireObject {
    schema
        .fields
        .iter()
        .filter(|f| f.is_settable())
        .filter(|f| schema.mkey.as_deref() != Some(f.name.as_str()))
        .map(|f| (f.wire_name.clone(), cleared(f)))
        .collect()
}

/// Explicit clear value: tables take an empty array, scalars `null`
fn cleared(field: &FieldSchema) -> Json {
    if field.field_type.is_list() {
        Json::Array(Vec::new())
    } else {
        Json::Null
    }
}
