//! Reconcile - Decide what a freshly read wire object writes into state
//!
//! Two policies apply at the top level:
//!
//! - **Import** writes every field the device returns.
//! - **Partial** (default) only refreshes fields the prior state already holds,
//!   so device-side defaults for fields the user never set do not show up as
//!   drift. Identity and device-computed fields are always refreshed.
//!
//! Keyed block lists are merged entry by entry using the block's key field and
//! the result is sorted, so repeated refreshes converge to the same order no
//! matter how the device orders its tables.
//!
//! Empty values ("", [], {}) are never stored. Combined with the rules above
//! this makes reconciliation idempotent: reconciling the same wire object
//! against its own output changes nothing.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde_json::Value as Json;

use crate::capability::Capabilities;
use crate::coerce::{self, json_type_name};
use crate::diagnostics::{Diagnostics, child_path};
use crate::marshal;
use crate::resource::{Attributes, Value, WireObject};
use crate::schema::{BlockSchema, FieldMode, FieldSchema, FieldType, ResourceSchema, ScalarType};

/// Which top-level fields a refresh writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Write every field returned by the device
    Import,
    /// Refresh only fields already present in state
    #[default]
    Partial,
}

/// Ordering applied to merged keyed lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Plain string order ("port10" < "port2")
    #[default]
    Alphabetical,
    /// Digit runs compare numerically ("port2" < "port10")
    Natural,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alphabetical" => Ok(SortMode::Alphabetical),
            "natural" => Ok(SortMode::Natural),
            other => Err(format!(
                "invalid sort mode '{}', expected 'alphabetical' or 'natural'",
                other
            )),
        }
    }
}

/// Options threaded through a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub mode: ReconcileMode,
    pub sort: SortMode,
    pub capabilities: Capabilities,
}

impl ReconcileOptions {
    pub fn import() -> Self {
        Self {
            mode: ReconcileMode::Import,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ReconcileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub attributes: Attributes,
    pub diagnostics: Diagnostics,
}

/// Reconcile a wire object against the prior configuration state
pub fn reconcile(
    wire: &WireObject,
    prior: &Attributes,
    schema: &ResourceSchema,
    options: &ReconcileOptions,
) -> Reconciled {
    let mut diags = Diagnostics::new();
    let mut attributes = HashMap::new();

    for field in &schema.fields {
        let prior_value = prior.get(&field.name);
        let always = schema.mkey.as_deref() == Some(field.name.as_str())
            || field.mode == FieldMode::Computed;
        let wanted = match options.mode {
            ReconcileMode::Import => true,
            ReconcileMode::Partial => always || prior_value.is_some_and(|v| !v.is_empty()),
        };
        if !wanted {
            continue;
        }

        match wire.get(&field.wire_name) {
            None => {
                if let Some(pv) = prior_value
                    && !options
                        .capabilities
                        .supports(&schema.resource_type, &field.name)
                {
                    log::debug!(
                        "{}: '{}' not supported by device firmware, keeping prior value",
                        schema.resource_type,
                        field.name
                    );
                    attributes.insert(field.name.clone(), pv.clone());
                } else {
                    log::debug!(
                        "{}: '{}' absent from response",
                        schema.resource_type,
                        field.name
                    );
                }
            }
            Some(w) => {
                match reconcile_value(w, prior_value, field, &field.name, options.sort, &mut diags)
                {
                    Some(v) if !v.is_empty() => {
                        attributes.insert(field.name.clone(), v);
                    }
                    Some(_) => {}
                    None => {
                        // type mismatch: leave the field as it was
                        if let Some(pv) = prior_value {
                            attributes.insert(field.name.clone(), pv.clone());
                        }
                    }
                }
            }
        }
    }

    Reconciled {
        attributes,
        diagnostics: diags,
    }
}

/// Reconcile one field. `None` means the wire value had the wrong type.
fn reconcile_value(
    wire: &Json,
    prior: Option<&Value>,
    field: &FieldSchema,
    path: &str,
    sort: SortMode,
    diags: &mut Diagnostics,
) -> Option<Value> {
    match &field.field_type {
        FieldType::Blocks(block) if block.key.is_some() => {
            merge_block(wire, prior, block, path, sort, diags).map(Value::List)
        }
        FieldType::Blocks(block) => {
            replace_block(wire, prior, block, path, sort, diags).map(Value::List)
        }
        FieldType::Scalar(_) | FieldType::List(_) => {
            marshal::flatten_field(wire, field, path, diags)
        }
    }
}

fn wire_items<'a>(wire: &'a Json, path: &str, diags: &mut Diagnostics) -> Option<&'a [Json]> {
    match wire {
        Json::Null => Some(&[]),
        Json::Array(items) => Some(items),
        other => {
            diags.type_mismatch(
                path,
                coerce::TypeMismatch {
                    expected: "Array".to_string(),
                    got: json_type_name(other).to_string(),
                },
            );
            None
        }
    }
}

fn wire_object<'a>(item: &'a Json, path: &str, diags: &mut Diagnostics) -> Option<&'a WireObject> {
    match item {
        Json::Object(obj) => Some(obj),
        other => {
            diags.type_mismatch(
                path,
                coerce::TypeMismatch {
                    expected: "Object".to_string(),
                    got: json_type_name(other).to_string(),
                },
            );
            None
        }
    }
}

fn prior_entries(prior: Option<&Value>) -> Vec<&HashMap<String, Value>> {
    prior
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_block).collect())
        .unwrap_or_default()
}

/// Merge a keyed wire table into the prior entries.
///
/// Incoming entries matched by key keep prior sub-fields the device did not
/// return; unmatched incoming entries are added; prior entries the device no
/// longer has are dropped. The result is sorted.
pub fn merge_block(
    wire: &Json,
    prior: Option<&Value>,
    block: &BlockSchema,
    path: &str,
    sort: SortMode,
    diags: &mut Diagnostics,
) -> Option<Vec<Value>> {
    let items = wire_items(wire, path, diags)?;
    let key_field = block.key.as_deref().and_then(|k| block.get(k));

    let mut by_key: HashMap<String, &HashMap<String, Value>> = HashMap::new();
    if let Some(key_field) = key_field {
        for entry in prior_entries(prior) {
            if let Some(k) = entry.get(&key_field.name) {
                by_key.insert(k.key_string(), entry);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        let Some(obj) = wire_object(item, &item_path, diags) else {
            continue;
        };

        let key = key_field.and_then(|kf| wire_key(obj, kf));
        if let Some(k) = &key
            && !seen.insert(k.clone())
        {
            log::warn!("{}: duplicate key '{}' in device response, ignoring", path, k);
            continue;
        }

        let matched = key.as_ref().and_then(|k| by_key.get(k).copied());
        let entry = reconcile_entry(obj, matched, block, &item_path, sort, diags);
        if !entry.is_empty() {
            merged.push(Value::Block(entry));
        }
    }

    sort_entries(&mut merged, block, sort);
    Some(merged)
}

/// Reconcile a keyless table, pairing entries by position
fn replace_block(
    wire: &Json,
    prior: Option<&Value>,
    block: &BlockSchema,
    path: &str,
    sort: SortMode,
    diags: &mut Diagnostics,
) -> Option<Vec<Value>> {
    let items = wire_items(wire, path, diags)?;
    let prior = prior_entries(prior);

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        let Some(obj) = wire_object(item, &item_path, diags) else {
            continue;
        };
        let entry = reconcile_entry(obj, prior.get(i).copied(), block, &item_path, sort, diags);
        if !entry.is_empty() {
            out.push(Value::Block(entry));
        }
    }
    Some(out)
}

/// Reconcile one table entry against its matched prior entry (if any)
fn reconcile_entry(
    obj: &WireObject,
    prior: Option<&HashMap<String, Value>>,
    block: &BlockSchema,
    path: &str,
    sort: SortMode,
    diags: &mut Diagnostics,
) -> HashMap<String, Value> {
    let mut entry = HashMap::new();

    for field in &block.fields {
        let prior_value = prior.and_then(|p| p.get(&field.name));
        let is_key = block.key.as_deref() == Some(field.name.as_str());
        let wanted = prior.is_none()
            || is_key
            || field.mode == FieldMode::Computed
            || prior_value.is_some_and(|v| !v.is_empty());
        if !wanted {
            continue;
        }

        let field_path = child_path(path, &field.name);
        let value = match obj.get(&field.wire_name) {
            // not returned by the device: keep what the configuration had
            None => prior_value.cloned(),
            Some(w) => reconcile_value(w, prior_value, field, &field_path, sort, diags)
                .or_else(|| prior_value.cloned()),
        };
        if let Some(v) = value
            && !v.is_empty()
        {
            entry.insert(field.name.clone(), v);
        }
    }

    entry
}

fn wire_key(obj: &WireObject, key_field: &FieldSchema) -> Option<String> {
    let wire = obj.get(&key_field.wire_name)?;
    let scalar = match &key_field.field_type {
        FieldType::Scalar(s) => s,
        _ => &ScalarType::String,
    };
    coerce::to_config(wire, scalar)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| v.key_string())
}

/// Sort merged entries by the block's ordering field, ties broken by key
pub fn sort_entries(entries: &mut [Value], block: &BlockSchema, sort: SortMode) {
    let Some(sort_field) = block.sort_field() else {
        return;
    };
    let key_field = block.key.as_deref();

    entries.sort_by(|a, b| {
        let get = |v: &Value, f: &str| v.as_block().and_then(|m| m.get(f)).cloned();
        let primary = compare_values(
            get(a, sort_field).as_ref(),
            get(b, sort_field).as_ref(),
            sort,
        );
        match (primary, key_field) {
            (Ordering::Equal, Some(k)) if k != sort_field => {
                compare_values(get(a, k).as_ref(), get(b, k).as_ref(), sort)
            }
            (ordering, _) => ordering,
        }
    });
}

/// Entries missing the sort value go last
fn compare_values(a: Option<&Value>, b: Option<&Value>, sort: SortMode) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Int(x)), Some(Value::Int(y))) => x.cmp(y),
        (Some(x), Some(y)) => {
            let (x, y) = (x.key_string(), y.key_string());
            match sort {
                SortMode::Alphabetical => x.cmp(&y),
                SortMode::Natural => natural_cmp(&x, &y),
            }
        }
    }
}

/// Compare strings treating runs of ASCII digits as numbers
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.chars().next(), b.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let da = a.len() - a.trim_start_matches(|c: char| c.is_ascii_digit()).len();
                let db = b.len() - b.trim_start_matches(|c: char| c.is_ascii_digit()).len();
                let (na, rest_a) = a.split_at(da);
                let (nb, rest_b) = b.split_at(db);
                let (ta, tb) = (na.trim_start_matches('0'), nb.trim_start_matches('0'));
                let ordering = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(ca), Some(cb)) => {
                if ca != cb {
                    return ca.cmp(&cb);
                }
                a = &a[ca.len_utf8()..];
                b = &b[cb.len_utf8()..];
            }
        }
    }
}

/// Bring configuration into the shape reconciled state takes: subnets in
/// CIDR form, keyed lists sorted. Values that do not fit the schema are
/// left for validation to report.
pub fn canonicalize(config: &Attributes, schema: &ResourceSchema, sort: SortMode) -> Attributes {
    config
        .iter()
        .map(|(name, value)| {
            let value = match schema.get(name) {
                Some(field) => canonical_value(value, &field.field_type, sort),
                None => value.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

fn canonical_value(value: &Value, field_type: &FieldType, sort: SortMode) -> Value {
    match (field_type, value) {
        (FieldType::Scalar(ScalarType::Subnet), Value::String(s)) => {
            Value::String(coerce::normalize_subnet(s).unwrap_or_else(|_| s.clone()))
        }
        (FieldType::List(ScalarType::Subnet), Value::List(items)) => Value::List(
            items
                .iter()
                .map(|v| canonical_value(v, &FieldType::Scalar(ScalarType::Subnet), sort))
                .collect(),
        ),
        (FieldType::Blocks(block), Value::List(items)) => {
            let mut entries: Vec<Value> = items
                .iter()
                .map(|item| match item {
                    Value::Block(fields) => Value::Block(
                        fields
                            .iter()
                            .map(|(k, v)| {
                                let v = match block.get(k) {
                                    Some(f) => canonical_value(v, &f.field_type, sort),
                                    None => v.clone(),
                                };
                                (k.clone(), v)
                            })
                            .collect(),
                    ),
                    other => other.clone(),
                })
                .collect();
            if block.key.is_some() {
                sort_entries(&mut entries, block, sort);
            }
            Value::List(entries)
        }
        _ => value.clone(),
    }
}
