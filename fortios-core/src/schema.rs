//! Schema - Describe the shape of FortiOS objects
//!
//! A schema maps each configuration field (snake_case) to its wire key
//! (kebab-case) and type. One schema drives flattening, reconciliation and
//! object building for every instance of a resource kind.

use std::fmt;

use heck::ToKebabCase;

use crate::coerce::normalize_subnet;
use crate::resource::{Attributes, Value};

/// Scalar field type
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarType {
    String,
    Int,
    Bool,
    /// String restricted to a set of values
    Enum(Vec<String>),
    /// IPv4 subnet, stored as "ip/prefix", sent as "ip mask"
    Subnet,
}

impl ScalarType {
    pub fn enumeration(values: &[&str]) -> Self {
        ScalarType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Zero value a `null` wire value flattens to
    pub fn zero(&self) -> Value {
        match self {
            ScalarType::String | ScalarType::Enum(_) | ScalarType::Subnet => {
                Value::String(String::new())
            }
            ScalarType::Int => Value::Int(0),
            ScalarType::Bool => Value::Bool(false),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::String => write!(f, "String"),
            ScalarType::Int => write!(f, "Int"),
            ScalarType::Bool => write!(f, "Bool"),
            ScalarType::Enum(variants) => write!(f, "Enum({})", variants.join(" | ")),
            ScalarType::Subnet => write!(f, "Subnet"),
        }
    }
}

/// Field type
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// List of scalars
    List(ScalarType),
    /// List of nested blocks (a FortiOS table)
    Blocks(Box<BlockSchema>),
}

impl FieldType {
    pub fn string() -> Self {
        FieldType::Scalar(ScalarType::String)
    }

    pub fn int() -> Self {
        FieldType::Scalar(ScalarType::Int)
    }

    pub fn bool() -> Self {
        FieldType::Scalar(ScalarType::Bool)
    }

    pub fn subnet() -> Self {
        FieldType::Scalar(ScalarType::Subnet)
    }

    pub fn enumeration(values: &[&str]) -> Self {
        FieldType::Scalar(ScalarType::enumeration(values))
    }

    pub fn blocks(block: BlockSchema) -> Self {
        FieldType::Blocks(Box::new(block))
    }

    /// Whether this field is cleared with an empty array rather than `null`
    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::List(_) | FieldType::Blocks(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(s) => write!(f, "{}", s),
            FieldType::List(s) => write!(f, "List<{}>", s),
            FieldType::Blocks(_) => write!(f, "List<Block>"),
        }
    }
}

/// How a field participates in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldMode {
    Required,
    #[default]
    Optional,
    /// Set by the device only
    Computed,
    /// May be set by the user, otherwise the device picks a value
    OptionalComputed,
}

/// Field schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// Configuration key (snake_case)
    pub name: String,
    /// Wire key (kebab-case)
    pub wire_name: String,
    pub field_type: FieldType,
    pub mode: FieldMode,
    pub default: Option<Value>,
    /// Maximum string length, enforced when building wire objects
    pub max_length: Option<usize>,
    pub description: Option<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            wire_name: name.to_kebab_case(),
            name,
            field_type,
            mode: FieldMode::Optional,
            default: None,
            max_length: None,
            description: None,
        }
    }

    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.mode = FieldMode::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.mode = FieldMode::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.mode = FieldMode::OptionalComputed;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Whether the user may set this field
    pub fn is_settable(&self) -> bool {
        self.mode != FieldMode::Computed
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.mode, FieldMode::Computed | FieldMode::OptionalComputed)
    }
}

/// Schema of the entries of a block list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockSchema {
    pub fields: Vec<FieldSchema>,
    /// Field identifying an entry; enables merge-by-key
    pub key: Option<String>,
    /// Field the merged list is sorted by, when it differs from the key
    pub order_by: Option<String>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn keyed_by(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn ordered_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field merged lists are sorted by
    pub fn sort_field(&self) -> Option<&str> {
        self.order_by.as_deref().or(self.key.as_deref())
    }

    /// The common FortiOS member table: entries holding a single `name`
    pub fn names(max_length: usize) -> Self {
        Self::new()
            .field(
                FieldSchema::new("name", FieldType::string())
                    .required()
                    .with_max_length(max_length),
            )
            .keyed_by("name")
    }
}

/// Resource schema
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    /// Resource type (e.g., "firewall_policy")
    pub resource_type: String,
    /// CMDB path (e.g., "firewall/policy")
    pub path: String,
    /// Identity field (config key); `None` for singletons
    pub mkey: Option<String>,
    /// Global setting without create/delete semantics
    pub singleton: bool,
    pub fields: Vec<FieldSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            path: path.into(),
            mkey: None,
            singleton: false,
            fields: Vec::new(),
            description: None,
        }
    }

    pub fn with_mkey(mut self, mkey: impl Into<String>) -> Self {
        self.mkey = Some(mkey.into());
        self
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn attribute(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn mkey_field(&self) -> Option<&FieldSchema> {
        self.mkey.as_deref().and_then(|k| self.get(k))
    }

    /// Names of fields the device may fill in on its own
    pub fn computed_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_computed())
            .map(|f| f.name.clone())
            .collect()
    }

    /// Fill unset fields that declare a default
    pub fn with_defaults(&self, attributes: &Attributes) -> Attributes {
        let mut out = attributes.clone();
        for field in &self.fields {
            if let Some(default) = &field.default
                && !out.contains_key(&field.name)
            {
                out.insert(field.name.clone(), default.clone());
            }
        }
        out
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();
        validate_fields(&self.fields, attributes, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_fields(fields: &[FieldSchema], attributes: &Attributes, errors: &mut Vec<TypeError>) {
    for field in fields {
        if field.mode == FieldMode::Required
            && !attributes.contains_key(&field.name)
            && field.default.is_none()
        {
            errors.push(TypeError::MissingRequired {
                name: field.name.clone(),
            });
        }
    }

    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();
    for name in names {
        let value = &attributes[name];
        match fields.iter().find(|f| &f.name == name) {
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            Some(field) if !field.is_settable() => {
                errors.push(TypeError::ComputedAttribute { name: name.clone() })
            }
            Some(field) => {
                if let Err(e) = validate_value(&field.field_type, value) {
                    errors.push(TypeError::Field {
                        name: name.clone(),
                        inner: Box::new(e),
                    });
                }
            }
        }
    }
}

fn validate_scalar(scalar: &ScalarType, value: &Value) -> Result<(), TypeError> {
    match (scalar, value) {
        (ScalarType::String, Value::String(_)) => Ok(()),
        (ScalarType::Int, Value::Int(_)) => Ok(()),
        (ScalarType::Bool, Value::Bool(_)) => Ok(()),
        (ScalarType::Enum(variants), Value::String(s)) => {
            if variants.iter().any(|v| v == s) {
                Ok(())
            } else {
                Err(TypeError::InvalidEnumVariant {
                    value: s.clone(),
                    expected: variants.clone(),
                })
            }
        }
        (ScalarType::Subnet, Value::String(s)) => normalize_subnet(s)
            .map(|_| ())
            .map_err(|e| TypeError::ValidationFailed {
                message: e.to_string(),
            }),
        _ => Err(TypeError::TypeMismatch {
            expected: scalar.to_string(),
            got: value.type_name().to_string(),
        }),
    }
}

fn validate_value(field_type: &FieldType, value: &Value) -> Result<(), TypeError> {
    match (field_type, value) {
        (FieldType::Scalar(scalar), v) => validate_scalar(scalar, v),
        (FieldType::List(scalar), Value::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_scalar(scalar, item).map_err(|e| TypeError::ListItemError {
                    index: i,
                    inner: Box::new(e),
                })?;
            }
            Ok(())
        }
        (FieldType::Blocks(block), Value::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                let Value::Block(fields) = item else {
                    return Err(TypeError::ListItemError {
                        index: i,
                        inner: Box::new(TypeError::TypeMismatch {
                            expected: "Block".to_string(),
                            got: item.type_name().to_string(),
                        }),
                    });
                };
                let mut errors = Vec::new();
                validate_fields(&block.fields, fields, &mut errors);
                if let Some(first) = errors.into_iter().next() {
                    return Err(TypeError::ListItemError {
                        index: i,
                        inner: Box::new(first),
                    });
                }
            }
            Ok(())
        }
        _ => Err(TypeError::TypeMismatch {
            expected: field_type.to_string(),
            got: value.type_name().to_string(),
        }),
    }
}

/// Type error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed by the device and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    Field { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },
}
