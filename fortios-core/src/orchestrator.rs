//! Orchestrator - Sequence build, transport and re-read for one resource
//!
//! Every mutating operation ends with a fresh read, so the state handed back
//! to the host always reflects what the device actually stored. A read that
//! finds nothing is not an error: it is how out-of-band deletion is detected.

use std::fmt;

use crate::builder;
use crate::capability::Capabilities;
use crate::coerce;
use crate::diagnostics::Diagnostics;
use crate::marshal::FieldConversionError;
use crate::reconcile::{self, ReconcileMode, ReconcileOptions, SortMode};
use crate::resource::{Attributes, Resource, ResourceId, State, Value, WireObject};
use crate::schema::ResourceSchema;
use crate::transport::{Transport, TransportError};

/// Lifecycle stage, as it appears in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "creating",
            Operation::Read => "reading",
            Operation::Update => "updating",
            Operation::Delete => "deleting",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("Error {op} {resource_type} resource: {source}")]
    Transport {
        op: Operation,
        resource_type: String,
        source: TransportError,
    },

    #[error("Error {op} {resource_type} resource while getting object: {source}")]
    Build {
        op: Operation,
        resource_type: String,
        source: FieldConversionError,
    },

    /// A keyed object was created but neither the device nor the
    /// configuration names it, so it cannot be read back
    #[error("Error {op} {resource_type} resource: device returned no mkey for the new object")]
    MissingIdentity {
        op: Operation,
        resource_type: String,
    },
}

impl OperationError {
    fn transport(op: Operation, schema: &ResourceSchema, source: TransportError) -> Self {
        OperationError::Transport {
            op,
            resource_type: schema.resource_type.clone(),
            source,
        }
    }

    fn build(op: Operation, schema: &ResourceSchema, source: FieldConversionError) -> Self {
        OperationError::Build {
            op,
            resource_type: schema.resource_type.clone(),
            source,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            OperationError::Transport { op, .. }
            | OperationError::Build { op, .. }
            | OperationError::MissingIdentity { op, .. } => *op,
        }
    }
}

/// Reconciliation settings applied to every read
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub mode: ReconcileMode,
    pub sort: SortMode,
    pub capabilities: Capabilities,
}

impl OrchestratorConfig {
    fn options(&self, mode: ReconcileMode) -> ReconcileOptions {
        ReconcileOptions {
            mode,
            sort: self.sort,
            capabilities: self.capabilities.clone(),
        }
    }
}

/// Refreshed state plus the type mismatches recovered while reading it
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub state: State,
    pub diagnostics: Diagnostics,
}

impl Outcome {
    fn not_found(id: &ResourceId) -> Self {
        Self {
            state: State::not_found(id.clone()),
            diagnostics: Diagnostics::new(),
        }
    }
}

pub struct Orchestrator<T: Transport> {
    transport: T,
    config: OrchestratorConfig,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, OrchestratorConfig::default())
    }

    pub fn with_config(transport: T, config: OrchestratorConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut OrchestratorConfig {
        &mut self.config
    }

    /// Create the resource and return its refreshed state
    pub async fn create(
        &self,
        schema: &ResourceSchema,
        resource: &Resource,
    ) -> Result<Outcome, OperationError> {
        let op = Operation::Create;
        let vdom = resource.vdom.as_deref();
        let obj = builder::build_object(schema, &resource.attributes, &self.config.capabilities)
            .map_err(|e| OperationError::build(op, schema, e))?;

        log::info!("creating {} ({} fields)", resource.id, obj.len());
        let response = if schema.singleton {
            self.transport.update(&schema.path, None, &obj, vdom).await
        } else {
            self.transport.create(&schema.path, &obj, vdom).await
        }
        .map_err(|e| OperationError::transport(op, schema, e))?;

        let identifier = match response_identifier(&response)
            .or_else(|| configured_identifier(schema, &resource.attributes))
        {
            Some(identifier) => identifier,
            None if schema.singleton => schema.resource_type.clone(),
            None => {
                return Err(OperationError::MissingIdentity {
                    op,
                    resource_type: schema.resource_type.clone(),
                });
            }
        };

        self.read_with(
            schema,
            &resource.id,
            &identifier,
            &resource.attributes,
            vdom,
            self.config.mode,
        )
        .await
    }

    /// Refresh the state of a resource.
    ///
    /// A device without the object yields `State::not_found` and `Ok`.
    pub async fn read(
        &self,
        schema: &ResourceSchema,
        id: &ResourceId,
        identifier: &str,
        prior: &Attributes,
        vdom: Option<&str>,
    ) -> Result<Outcome, OperationError> {
        self.read_with(schema, id, identifier, prior, vdom, self.config.mode)
            .await
    }

    /// Read a resource the host has no state for, writing every field
    pub async fn import(
        &self,
        schema: &ResourceSchema,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> Result<Outcome, OperationError> {
        self.read_with(
            schema,
            id,
            identifier,
            &Attributes::new(),
            vdom,
            ReconcileMode::Import,
        )
        .await
    }

    /// Update the resource and return its refreshed state
    pub async fn update(
        &self,
        schema: &ResourceSchema,
        identifier: &str,
        prior: &State,
        resource: &Resource,
    ) -> Result<Outcome, OperationError> {
        let op = Operation::Update;
        let vdom = resource.vdom.as_deref();
        let obj = builder::build_update(
            schema,
            &resource.attributes,
            &prior.attributes,
            &self.config.capabilities,
        )
        .map_err(|e| OperationError::build(op, schema, e))?;

        log::info!("updating {} ({} fields)", resource.id, obj.len());
        let response = self
            .transport
            .update(&schema.path, mkey_of(schema, identifier), &obj, vdom)
            .await
            .map_err(|e| OperationError::transport(op, schema, e))?;

        // Changing the mkey field renames the object on the device
        let current = response_identifier(&response)
            .or_else(|| configured_identifier(schema, &resource.attributes))
            .unwrap_or_else(|| identifier.to_string());
        if current != identifier {
            log::info!("{} renamed from {} to {}", resource.id, identifier, current);
        }

        self.read_with(
            schema,
            &resource.id,
            &current,
            &resource.attributes,
            vdom,
            self.config.mode,
        )
        .await
    }

    /// Delete the resource. Singleton settings are reset to device defaults.
    pub async fn delete(
        &self,
        schema: &ResourceSchema,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> Result<(), OperationError> {
        let op = Operation::Delete;
        if schema.singleton {
            let obj = builder::build_reset(schema);
            log::info!("resetting {} to defaults", id);
            self.transport
                .update(&schema.path, None, &obj, vdom)
                .await
                .map_err(|e| OperationError::transport(op, schema, e))?;
        } else {
            log::info!("deleting {} ({})", id, identifier);
            self.transport
                .delete(&schema.path, identifier, vdom)
                .await
                .map_err(|e| OperationError::transport(op, schema, e))?;
        }
        Ok(())
    }

    async fn read_with(
        &self,
        schema: &ResourceSchema,
        id: &ResourceId,
        identifier: &str,
        prior: &Attributes,
        vdom: Option<&str>,
        mode: ReconcileMode,
    ) -> Result<Outcome, OperationError> {
        let wire = self
            .transport
            .read(&schema.path, mkey_of(schema, identifier), vdom)
            .await
            .map_err(|e| OperationError::transport(Operation::Read, schema, e))?;

        let Some(wire) = wire else {
            log::info!("{} not found on device", id);
            return Ok(Outcome::not_found(id));
        };

        let reconciled = reconcile::reconcile(&wire, prior, schema, &self.config.options(mode));
        let state = State::existing(id.clone(), reconciled.attributes)
            .with_identifier(identifier)
            .with_vdom(vdom.map(str::to_string));

        Ok(Outcome {
            state,
            diagnostics: reconciled.diagnostics,
        })
    }
}

/// Singletons are addressed by path alone
fn mkey_of<'a>(schema: &ResourceSchema, identifier: &'a str) -> Option<&'a str> {
    if schema.singleton {
        None
    } else {
        Some(identifier)
    }
}

/// The `mkey` a create or update response carries; whole floats count as integers
fn response_identifier(response: &WireObject) -> Option<String> {
    match response.get("mkey")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => coerce::number_to_int(n).map(|i| i.to_string()),
        _ => None,
    }
}

fn configured_identifier(schema: &ResourceSchema, attributes: &Attributes) -> Option<String> {
    schema
        .mkey
        .as_deref()
        .and_then(|k| attributes.get(k))
        .map(Value::key_string)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{FirmwareVersion, VersionRange};
    use crate::resource::WireObject;
    use crate::schema::{BlockSchema, FieldSchema, FieldType};
    use crate::transport::{BoxFuture, TransportResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(WireObject),
        Read(Option<String>),
        Update(Option<String>, WireObject),
        Delete(String),
    }

    /// Device stand-in keyed by mkey; assigns integer ids when the body has none
    #[derive(Default)]
    struct MemoryTransport {
        objects: Mutex<HashMap<String, WireObject>>,
        calls: Mutex<Vec<Call>>,
        mkey_field: &'static str,
        fail_with: Option<u16>,
        /// Report assigned ids as JSON floats (`5.0`)
        float_ids: bool,
        /// Leave `mkey` out of create responses
        omit_mkey: bool,
    }

    impl MemoryTransport {
        fn keyed_by(mkey_field: &'static str) -> Self {
            Self {
                mkey_field,
                ..Default::default()
            }
        }

        fn insert(&self, mkey: &str, obj: serde_json::Value) {
            let serde_json::Value::Object(obj) = obj else {
                panic!("expected object")
            };
            self.objects.lock().unwrap().insert(mkey.to_string(), obj);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn fail(&self) -> TransportResult<()> {
            match self.fail_with {
                Some(status) => Err(TransportError::new("internal error").with_status(status)),
                None => Ok(()),
            }
        }
    }

    impl Transport for MemoryTransport {
        fn create<'a>(
            &'a self,
            _path: &'a str,
            obj: &'a WireObject,
            _vdom: Option<&'a str>,
        ) -> BoxFuture<'a, TransportResult<WireObject>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(Call::Create(obj.clone()));
                self.fail()?;
                let mut objects = self.objects.lock().unwrap();
                let mut stored = obj.clone();
                let (mkey, reported) = match obj.get(self.mkey_field) {
                    Some(v) => {
                        let mkey = v.to_string().trim_matches('"').to_string();
                        (mkey.clone(), json!(mkey))
                    }
                    None => {
                        let next = objects.len() + 1;
                        stored.insert(self.mkey_field.to_string(), json!(next));
                        let reported = if self.float_ids {
                            json!(next as f64)
                        } else {
                            json!(next.to_string())
                        };
                        (next.to_string(), reported)
                    }
                };
                objects.insert(mkey, stored);
                let mut response = WireObject::new();
                if !self.omit_mkey {
                    response.insert("mkey".to_string(), reported);
                }
                Ok(response)
            })
        }

        fn read<'a>(
            &'a self,
            _path: &'a str,
            mkey: Option<&'a str>,
            _vdom: Option<&'a str>,
        ) -> BoxFuture<'a, TransportResult<Option<WireObject>>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(Call::Read(mkey.map(str::to_string)));
                let objects = self.objects.lock().unwrap();
                Ok(objects.get(mkey.unwrap_or("")).cloned())
            })
        }

        fn update<'a>(
            &'a self,
            _path: &'a str,
            mkey: Option<&'a str>,
            obj: &'a WireObject,
            _vdom: Option<&'a str>,
        ) -> BoxFuture<'a, TransportResult<WireObject>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(Call::Update(mkey.map(str::to_string), obj.clone()));
                self.fail()?;
                let mut objects = self.objects.lock().unwrap();
                let key = mkey.unwrap_or("").to_string();
                let mut stored = objects.remove(&key).unwrap_or_default();
                for (k, v) in obj {
                    if v.is_null() {
                        stored.remove(k);
                    } else {
                        stored.insert(k.clone(), v.clone());
                    }
                }
                let mut response = WireObject::new();
                let key = match (mkey, stored.get(self.mkey_field).and_then(|v| v.as_str())) {
                    (Some(_), Some(renamed)) => renamed.to_string(),
                    _ => key,
                };
                if mkey.is_some() {
                    response.insert("mkey".to_string(), json!(key));
                }
                objects.insert(key, stored);
                Ok(response)
            })
        }

        fn delete<'a>(
            &'a self,
            _path: &'a str,
            mkey: &'a str,
            _vdom: Option<&'a str>,
        ) -> BoxFuture<'a, TransportResult<()>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(Call::Delete(mkey.to_string()));
                self.fail()?;
                self.objects.lock().unwrap().remove(mkey);
                Ok(())
            })
        }
    }

    fn policy_schema() -> ResourceSchema {
        ResourceSchema::new("firewall_policy", "firewall/policy")
            .with_mkey("policyid")
            .attribute(FieldSchema::new("policyid", FieldType::int()).optional_computed())
            .attribute(FieldSchema::new("name", FieldType::string()).with_max_length(35))
            .attribute(FieldSchema::new("comment", FieldType::string()))
            .attribute(FieldSchema::new("certificate", FieldType::string()))
            .attribute(FieldSchema::new("look_back", FieldType::int()))
            .attribute(FieldSchema::new("srcaddr", FieldType::blocks(BlockSchema::names(79))))
    }

    fn global_schema() -> ResourceSchema {
        ResourceSchema::new("system_global", "system/global")
            .singleton()
            .attribute(FieldSchema::new("hostname", FieldType::string()))
            .attribute(FieldSchema::new("admin_port", FieldType::int()))
    }

    fn wire(value: serde_json::Value) -> WireObject {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn read_missing_object_is_not_found() {
        let orchestrator = Orchestrator::new(MemoryTransport::keyed_by("policyid"));
        let id = ResourceId::new("firewall_policy", "web");
        let prior: Attributes = [("name".to_string(), Value::string("web"))].into();

        let outcome = orchestrator
            .read(&policy_schema(), &id, "7", &prior, None)
            .await
            .unwrap();
        assert!(!outcome.state.exists);
        assert_eq!(outcome.state.identifier, None);
        assert!(outcome.state.attributes.is_empty());
    }

    #[tokio::test]
    async fn create_uses_returned_identity_and_rereads() {
        let orchestrator = Orchestrator::new(MemoryTransport::keyed_by("policyid"));
        let resource = Resource::new("firewall_policy", "web")
            .with_attribute("name", Value::string("web"))
            .with_attribute("comment", Value::string("x"));

        let outcome = orchestrator.create(&policy_schema(), &resource).await.unwrap();
        assert_eq!(outcome.state.identifier.as_deref(), Some("1"));
        assert_eq!(
            outcome.state.attributes,
            [
                ("policyid".to_string(), Value::Int(1)),
                ("name".to_string(), Value::string("web")),
                ("comment".to_string(), Value::string("x")),
            ]
            .into()
        );

        let calls = orchestrator.transport().calls();
        // look_back was never set, so it is not sent
        assert_eq!(
            calls,
            vec![
                Call::Create(wire(json!({"name": "web", "comment": "x"}))),
                Call::Read(Some("1".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn partial_read_ignores_device_defaults() {
        let transport = MemoryTransport::keyed_by("policyid");
        transport.insert(
            "3",
            json!({"policyid": 3, "name": "web", "look-back": 0, "certificate": "", "srcaddr": []}),
        );
        let orchestrator = Orchestrator::new(transport);
        let id = ResourceId::new("firewall_policy", "web");
        let prior: Attributes = [("name".to_string(), Value::string("web"))].into();

        let outcome = orchestrator
            .read(&policy_schema(), &id, "3", &prior, None)
            .await
            .unwrap();
        assert_eq!(
            outcome.state.attributes,
            [
                ("policyid".to_string(), Value::Int(3)),
                ("name".to_string(), Value::string("web")),
            ]
            .into()
        );
    }

    #[tokio::test]
    async fn import_writes_every_field() {
        let transport = MemoryTransport::keyed_by("policyid");
        transport.insert(
            "3",
            json!({"policyid": 3, "name": "web", "look-back": 0, "srcaddr": [{"name": "all"}]}),
        );
        let orchestrator = Orchestrator::new(transport);
        let id = ResourceId::new("firewall_policy", "web");

        let outcome = orchestrator
            .import(&policy_schema(), &id, "3", Some("root"))
            .await
            .unwrap();
        assert_eq!(outcome.state.attributes["look_back"], Value::Int(0));
        assert_eq!(outcome.state.vdom.as_deref(), Some("root"));
        assert_eq!(outcome.state.attributes.len(), 4);
    }

    #[tokio::test]
    async fn update_sends_explicit_clear() {
        let transport = MemoryTransport::keyed_by("policyid");
        transport.insert("3", json!({"policyid": 3, "name": "web", "certificate": "cert1"}));
        let orchestrator = Orchestrator::new(transport);
        let id = ResourceId::new("firewall_policy", "web");

        let prior = State::existing(
            id.clone(),
            [
                ("policyid".to_string(), Value::Int(3)),
                ("name".to_string(), Value::string("web")),
                ("certificate".to_string(), Value::string("cert1")),
            ]
            .into(),
        )
        .with_identifier("3");
        let desired =
            Resource::new("firewall_policy", "web").with_attribute("name", Value::string("web"));

        let outcome = orchestrator
            .update(&policy_schema(), "3", &prior, &desired)
            .await
            .unwrap();
        assert!(!outcome.state.attributes.contains_key("certificate"));

        let calls = orchestrator.transport().calls();
        assert_eq!(
            calls[0],
            Call::Update(
                Some("3".to_string()),
                wire(json!({"name": "web", "certificate": null}))
            )
        );
    }

    #[tokio::test]
    async fn singleton_create_and_delete() {
        let orchestrator = Orchestrator::new(MemoryTransport::keyed_by("mkey"));
        let schema = global_schema();
        let resource =
            Resource::new("system_global", "main").with_attribute("hostname", Value::string("fw1"));

        let outcome = orchestrator.create(&schema, &resource).await.unwrap();
        assert_eq!(outcome.state.identifier.as_deref(), Some("system_global"));
        assert_eq!(outcome.state.attributes["hostname"], Value::string("fw1"));

        orchestrator
            .delete(&schema, &resource.id, "system_global", None)
            .await
            .unwrap();
        let calls = orchestrator.transport().calls();
        assert_eq!(
            calls.last().unwrap(),
            &Call::Update(None, wire(json!({"hostname": null, "admin-port": null})))
        );
    }

    #[tokio::test]
    async fn delete_object() {
        let transport = MemoryTransport::keyed_by("policyid");
        transport.insert("3", json!({"policyid": 3}));
        let orchestrator = Orchestrator::new(transport);
        let id = ResourceId::new("firewall_policy", "web");

        orchestrator
            .delete(&policy_schema(), &id, "3", None)
            .await
            .unwrap();
        let outcome = orchestrator
            .read(&policy_schema(), &id, "3", &Attributes::new(), None)
            .await
            .unwrap();
        assert!(!outcome.state.exists);
    }

    #[tokio::test]
    async fn transport_errors_name_the_stage() {
        let transport = MemoryTransport {
            fail_with: Some(500),
            ..MemoryTransport::keyed_by("policyid")
        };
        let orchestrator = Orchestrator::new(transport);
        let resource =
            Resource::new("firewall_policy", "web").with_attribute("name", Value::string("web"));

        let err = orchestrator.create(&policy_schema(), &resource).await.unwrap_err();
        assert_eq!(err.operation(), Operation::Create);
        assert_eq!(
            err.to_string(),
            "Error creating firewall_policy resource: HTTP 500: internal error"
        );
    }

    #[tokio::test]
    async fn build_errors_abort_before_transport() {
        let orchestrator = Orchestrator::new(MemoryTransport::keyed_by("policyid"));
        let resource = Resource::new("firewall_policy", "web")
            .with_attribute("name", Value::string("w".repeat(40)));

        let err = orchestrator.create(&policy_schema(), &resource).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error creating firewall_policy resource while getting object: field 'name': length 40 exceeds maximum of 35"
        );
        assert!(orchestrator.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn unsupported_field_keeps_prior_on_older_firmware() {
        let transport = MemoryTransport::keyed_by("policyid");
        transport.insert("3", json!({"policyid": 3, "name": "web"}));
        let config = OrchestratorConfig {
            capabilities: Capabilities::new()
                .with_device_version(FirmwareVersion::new(6, 4, 0))
                .field(
                    "firewall_policy",
                    "look_back",
                    VersionRange::since(FirmwareVersion::new(7, 2, 0)),
                ),
            ..Default::default()
        };
        let orchestrator = Orchestrator::with_config(transport, config);
        let id = ResourceId::new("firewall_policy", "web");
        let prior: Attributes = [
            ("name".to_string(), Value::string("web")),
            ("look_back".to_string(), Value::Int(5)),
        ]
        .into();

        let outcome = orchestrator
            .read(&policy_schema(), &id, "3", &prior, None)
            .await
            .unwrap();
        assert_eq!(outcome.state.attributes["look_back"], Value::Int(5));
    }

    #[tokio::test]
    async fn create_truncates_float_identity() {
        let transport = MemoryTransport {
            float_ids: true,
            ..MemoryTransport::keyed_by("policyid")
        };
        let orchestrator = Orchestrator::new(transport);
        let resource =
            Resource::new("firewall_policy", "web").with_attribute("name", Value::string("web"));

        let outcome = orchestrator.create(&policy_schema(), &resource).await.unwrap();
        assert!(outcome.state.exists);
        assert_eq!(outcome.state.identifier.as_deref(), Some("1"));
        assert_eq!(
            orchestrator.transport().calls().last(),
            Some(&Call::Read(Some("1".to_string())))
        );
    }

    #[tokio::test]
    async fn create_without_identity_fails_for_keyed_objects() {
        let transport = MemoryTransport {
            omit_mkey: true,
            ..MemoryTransport::keyed_by("policyid")
        };
        let orchestrator = Orchestrator::new(transport);
        let resource =
            Resource::new("firewall_policy", "web").with_attribute("name", Value::string("web"));

        let err = orchestrator.create(&policy_schema(), &resource).await.unwrap_err();
        assert_eq!(err.operation(), Operation::Create);
        assert_eq!(
            err.to_string(),
            "Error creating firewall_policy resource: device returned no mkey for the new object"
        );
        // Never falls back to reading by type name
        assert!(
            !orchestrator
                .transport()
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Read(_)))
        );
    }

    #[tokio::test]
    async fn create_falls_back_to_configured_mkey() {
        let transport = MemoryTransport {
            omit_mkey: true,
            ..MemoryTransport::keyed_by("policyid")
        };
        let orchestrator = Orchestrator::new(transport);
        let resource = Resource::new("firewall_policy", "web")
            .with_attribute("policyid", Value::Int(9))
            .with_attribute("name", Value::string("web"));

        let outcome = orchestrator.create(&policy_schema(), &resource).await.unwrap();
        assert_eq!(outcome.state.identifier.as_deref(), Some("9"));
        assert!(outcome.state.exists);
    }

    #[tokio::test]
    async fn update_follows_renamed_mkey() {
        let schema = ResourceSchema::new("firewall_address", "firewall/address")
            .with_mkey("name")
            .attribute(FieldSchema::new("name", FieldType::string()))
            .attribute(FieldSchema::new("comment", FieldType::string()));
        let transport = MemoryTransport::keyed_by("name");
        transport.insert("old", json!({"name": "old", "comment": "lan"}));
        let orchestrator = Orchestrator::new(transport);

        let id = ResourceId::new("firewall_address", "lan");
        let prior = State::existing(
            id.clone(),
            [
                ("name".to_string(), Value::string("old")),
                ("comment".to_string(), Value::string("lan")),
            ]
            .into(),
        )
        .with_identifier("old");
        let desired = Resource::new("firewall_address", "lan")
            .with_attribute("name", Value::string("new"))
            .with_attribute("comment", Value::string("lan"));

        let outcome = orchestrator
            .update(&schema, "old", &prior, &desired)
            .await
            .unwrap();
        assert!(outcome.state.exists);
        assert_eq!(outcome.state.identifier.as_deref(), Some("new"));
        assert_eq!(outcome.state.attributes["name"], Value::string("new"));
        assert_eq!(
            orchestrator.transport().calls(),
            vec![
                Call::Update(
                    Some("old".to_string()),
                    wire(json!({"name": "new", "comment": "lan"}))
                ),
                Call::Read(Some("new".to_string())),
            ]
        );
    }
}
