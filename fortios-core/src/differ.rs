//! Differ - Compare desired configuration with refreshed state to generate a Plan
//!
//! Only attributes the configuration declares are compared. Refreshed state
//! is reconciled in partial mode, so it never carries device defaults for
//! fields the user left out.

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Attributes, Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired configuration with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let mut changed = find_changed_attributes(&desired.attributes, &current.attributes);
    if let (Some(want), Some(have)) = (&desired.vdom, &current.vdom)
        && want != have
    {
        changed.push("vdom".to_string());
    }

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Attributes whose desired value differs from the current one, sorted.
///
/// An empty desired value matches an absent current value, since empty
/// values are never stored.
fn find_changed_attributes(desired: &Attributes, current: &Attributes) -> Vec<String> {
    let mut changed: Vec<String> = desired
        .iter()
        .filter(|(key, desired_value)| match current.get(*key) {
            Some(current_value) => current_value != *desired_value,
            None => !desired_value.is_empty(),
        })
        .map(|(key, _)| key.clone())
        .collect();

    // Fields dropped from the configuration are cleared on update
    changed.extend(
        current
            .iter()
            .filter(|(key, value)| !desired.contains_key(*key) && !value.is_empty())
            .map(|(key, _)| key.clone()),
    );

    changed.sort();
    changed
}

/// Compute the plan for a set of desired resources.
///
/// `current_states` holds the refreshed state of every resource known to the
/// state store. Known resources missing from `desired` are deleted, or reset
/// when their schema is a singleton. Computed fields never count as changes
/// unless the configuration sets them.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &[ResourceSchema],
) -> Plan {
    let schemas: HashMap<&str, &ResourceSchema> = schemas
        .iter()
        .map(|s| (s.resource_type.as_str(), s))
        .collect();
    let mut plan = Plan::new();

    for resource in desired {
        if resource.is_data_source() {
            plan.add(Effect::Read(resource.clone()));
            continue;
        }

        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));
        let current = match schemas.get(resource.id.resource_type.as_str()) {
            Some(schema) => without_computed(current, resource, &schema.computed_fields()),
            None => current,
        };

        match diff(resource, &current) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    let declared: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|s| s.exists && !declared.contains(&s.id))
        .collect();
    orphans.sort_by_key(|s| s.id.to_string());
    for state in orphans {
        let singleton = schemas
            .get(state.id.resource_type.as_str())
            .is_some_and(|s| s.singleton);
        plan.add(if singleton {
            Effect::Reset(state.clone())
        } else {
            Effect::Delete(state.clone())
        });
    }

    plan
}

fn without_computed(mut state: State, desired: &Resource, computed: &[String]) -> State {
    for name in computed {
        if !desired.attributes.contains_key(name) {
            state.attributes.remove(name);
        }
    }
    state
}
