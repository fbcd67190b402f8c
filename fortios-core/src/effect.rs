//! Effect - A side effect the plan will perform on the device
//!
//! Effects are values: building a plan only describes what would happen.
//! Nothing touches the device until an effect is applied.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Refresh a data source; never modifies the device
    Read(Resource),
    Create(Resource),
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Return a global setting the configuration no longer declares to its
    /// device defaults
    Reset(State),
    /// Remove an object the configuration no longer declares
    Delete(State),
}

impl Effect {
    /// Whether applying this effect changes the device
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(r) | Effect::Create(r) => &r.id,
            Effect::Update { id, .. } => id,
            Effect::Reset(state) | Effect::Delete(state) => &state.id,
        }
    }
}
