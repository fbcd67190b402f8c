//! Plan execution against a Provider and the state file

use std::collections::HashMap;

use fortios_core::differ::create_plan;
use fortios_core::effect::Effect;
use fortios_core::plan::Plan;
use fortios_core::provider::{Provider, ProviderResult};
use fortios_core::{Resource, ResourceId, State};
use fortios_state::StateFile;

/// What applying one effect produced
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Managed object created or updated; its refreshed state
    Stored(State),
    /// Object deleted or global setting reset
    Removed(ResourceId),
    /// Data source read; never persisted
    Observed(State),
}

/// Device-side identity of a stored resource
pub fn identifier_of(state: &State) -> String {
    state
        .identifier
        .clone()
        .unwrap_or_else(|| state.id.resource_type.clone())
}

/// Refresh every resource recorded in the state file
pub async fn refresh(
    provider: &dyn Provider,
    state_file: &StateFile,
) -> ProviderResult<HashMap<ResourceId, State>> {
    let mut states = HashMap::new();
    for stored in &state_file.resources {
        let prior = stored.to_state();
        let refreshed = provider
            .read(&prior.id, &identifier_of(&prior), &prior)
            .await?;
        if !refreshed.exists {
            log::info!("{} no longer exists on the device", prior.id);
        }
        states.insert(prior.id.clone(), refreshed);
    }
    Ok(states)
}

/// Plan the changes that bring the device to `desired`
pub fn plan(
    provider: &dyn Provider,
    desired: &[Resource],
    current: &HashMap<ResourceId, State>,
) -> Plan {
    create_plan(desired, current, &provider.schemas())
}

/// Order plan effects for execution.
///
/// Reads, creates and updates keep configuration order. Resets and deletes
/// run last, in reverse of the order the state file recorded their
/// resources, so groups go before the members they reference.
pub fn schedule<'a>(plan: &'a Plan, state_file: &StateFile) -> Vec<&'a Effect> {
    let position: HashMap<ResourceId, usize> = state_file
        .resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id(), i))
        .collect();

    let (mut deletes, mut ordered): (Vec<&Effect>, Vec<&Effect>) = plan
        .effects()
        .iter()
        .partition(|e| matches!(e, Effect::Reset(_) | Effect::Delete(_)));
    deletes.sort_by_key(|e| std::cmp::Reverse(position.get(e.resource_id()).copied()));
    ordered.extend(deletes);
    ordered
}

pub async fn apply_effect(provider: &dyn Provider, effect: &Effect) -> ProviderResult<Applied> {
    match effect {
        Effect::Read(resource) => provider.create(resource).await.map(Applied::Observed),
        Effect::Create(resource) => provider.create(resource).await.map(Applied::Stored),
        Effect::Update { id, from, to, .. } => provider
            .update(id, &identifier_of(from), from, to)
            .await
            .map(Applied::Stored),
        Effect::Reset(state) | Effect::Delete(state) => {
            provider
                .delete(&state.id, &identifier_of(state), state.vdom.as_deref())
                .await?;
            Ok(Applied::Removed(state.id.clone()))
        }
    }
}

/// Record an applied effect in the state file
pub fn record(state_file: &mut StateFile, applied: &Applied) {
    match applied {
        Applied::Stored(state) => state_file.record(state),
        Applied::Removed(id) => {
            state_file.remove_resource(id);
        }
        Applied::Observed(_) => {}
    }
}
