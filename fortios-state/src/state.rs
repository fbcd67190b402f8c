//! What the last run learned about each managed FortiOS object

use std::collections::HashMap;

use fortios_core::resource::{attributes_from_json, attributes_to_json};
use fortios_core::{ResourceId, State};
use serde::{Deserialize, Serialize};

/// Contents of `fortios.state.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// Layout version of this file
    pub version: u32,
    /// Bumped on every write
    pub serial: u64,
    /// Fixed when the file is first created; a write carrying another
    /// lineage is refused
    pub lineage: String,
    /// Crate version of the last writer
    pub fortios_version: String,
    /// Managed objects in the order they were first stored
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    /// Empty state with a fresh lineage
    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            fortios_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Prepare for a write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.fortios_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.matches(id))
    }

    /// Replace the stored entry for the resource, or append it
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        let id = resource.id();
        match self.resources.iter_mut().find(|r| r.matches(&id)) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.matches(id))?;
        Some(self.resources.remove(pos))
    }

    /// Record the outcome of a refresh: existing objects are stored, vanished ones dropped
    pub fn record(&mut self, state: &State) {
        if state.exists {
            self.upsert_resource(ResourceState::from_state(state));
        } else {
            self.remove_resource(&state.id);
        }
    }

    /// Every stored resource as a core `State`, keyed by resource id
    pub fn states(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| (r.id(), r.to_state()))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// One managed object as last read from the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "firewall_address", "system_global")
    pub resource_type: String,
    /// Resource name given in the configuration file
    pub name: String,
    /// Device-side identity (the object's mkey)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdom: Option<String>,
    /// Refreshed attributes as JSON values, keyed by config name
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            identifier: None,
            vdom: None,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn from_state(state: &State) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier: state.identifier.clone(),
            vdom: state.vdom.clone(),
            attributes: attributes_to_json(&state.attributes),
        }
    }

    pub fn to_state(&self) -> State {
        let mut state = State::existing(self.id(), attributes_from_json(&self.attributes))
            .with_vdom(self.vdom.clone());
        state.identifier = self.identifier.clone();
        state
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    fn matches(&self, id: &ResourceId) -> bool {
        self.resource_type == id.resource_type && self.name == id.name
    }
}
