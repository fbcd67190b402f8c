//! Resource - Configuration values, desired resources and their refreshed state

use std::collections::HashMap;

/// Object as decoded from a FortiOS JSON response, keyed by wire (kebab-case) name
pub type WireObject = serde_json::Map<String, serde_json::Value>;

/// Typed configuration state, keyed by config (snake_case) name
pub type Attributes = HashMap<String, Value>;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "firewall_policy", "system_global")
    pub resource_type: String,
    /// Resource name (identifier given by the user)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Configuration value of a resource attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    /// One entry of a block list, keyed by config field name
    Block(HashMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Returns true for values that carry no configuration: "", [] and {}.
    /// Integers and booleans are never empty; zero is a setting like any other.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Block(fields) => fields.is_empty(),
            Value::Int(_) | Value::Bool(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Block(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::List(_) => "List",
            Value::Block(_) => "Block",
        }
    }

    /// Render the value as a sort/identity key
    pub fn key_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(_) | Value::Block(_) => self.to_json().to_string(),
        }
    }

    /// Convert to plain JSON, used for persisting state and rendering plans
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Block(fields) => {
                let mut keys: Vec<&String> = fields.keys().collect();
                keys.sort();
                let map = keys
                    .into_iter()
                    .map(|k| (k.clone(), fields[k].to_json()))
                    .collect();
                serde_json::Value::Object(map)
            }
        }
    }

    /// Convert plain JSON (state file, configuration file) to a Value.
    ///
    /// `null` and non-integral numbers have no configuration counterpart and
    /// yield `None`; inside lists and blocks they are skipped.
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int),
            serde_json::Value::Array(items) => {
                Some(Value::List(items.iter().filter_map(Value::from_json).collect()))
            }
            serde_json::Value::Object(map) => Some(Value::Block(
                map.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }
}

/// Convert an attribute map to a JSON object
pub fn attributes_to_json(attributes: &Attributes) -> serde_json::Map<String, serde_json::Value> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Convert a JSON object to an attribute map, dropping nulls
pub fn attributes_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Attributes {
    map.iter()
        .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Desired state declared by the user
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: Attributes,
    /// Target virtual domain (`vdomparam`); `None` uses the transport default
    pub vdom: Option<String>,
    /// If true, this is a data source (read-only) that won't be modified
    pub read_only: bool,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            vdom: None,
            read_only: false,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_vdom(mut self, vdom: impl Into<String>) -> Self {
        let vdom = vdom.into();
        self.vdom = if vdom.is_empty() { None } else { Some(vdom) };
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }
}

/// Current state fetched from the device
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Device-side identity (the object's mkey)
    pub identifier: Option<String>,
    pub attributes: Attributes,
    pub vdom: Option<String>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            vdom: None,
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: Attributes) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            vdom: None,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_vdom(mut self, vdom: Option<String>) -> Self {
        self.vdom = vdom;
        self
    }
}
