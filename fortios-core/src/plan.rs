//! Plan - Ordered effects for one run against a FortiGate
//!
//! Building a plan touches nothing on the device; the CLI shows it first and
//! then applies the effects one at a time.

use std::fmt;

use crate::effect::Effect;

#[derive(Debug, Clone, Default)]
pub struct Plan {
    effects: Vec<Effect>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Whether applying the plan would change the device; data-source reads
    /// alone do not
    pub fn changes_device(&self) -> bool {
        self.effects.iter().any(Effect::is_mutating)
    }

    pub fn summary(&self) -> PlanSummary {
        self.effects
            .iter()
            .fold(PlanSummary::default(), |summary, effect| summary.count(effect))
    }
}

/// Mutating effects by kind. Resets of global settings are kept apart from
/// deletes: the setting stays on the device with its defaults.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub reset: usize,
    pub delete: usize,
}

impl PlanSummary {
    fn count(mut self, effect: &Effect) -> Self {
        match effect {
            Effect::Read(_) => {}
            Effect::Create(_) => self.create += 1,
            Effect::Update { .. } => self.update += 1,
            Effect::Reset(_) => self.reset += 1,
            Effect::Delete(_) => self.delete += 1,
        }
        self
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to add, {} to change, ", self.create, self.update)?;
        if self.reset > 0 {
            write!(f, "{} to reset, ", self.reset)?;
        }
        write!(f, "{} to destroy", self.delete)
    }
}

/// One-line label for logs, e.g. `delete firewall_policy.web (mkey 7)`
pub fn describe(effect: &Effect) -> String {
    match effect {
        Effect::Read(r) => format!("read {}", r.id),
        Effect::Create(r) => format!("create {}", r.id),
        Effect::Update { id, .. } => format!("update {}", id),
        Effect::Reset(state) => format!("reset {}", state.id),
        Effect::Delete(state) => match &state.identifier {
            Some(mkey) => format!("delete {} (mkey {})", state.id, mkey),
            None => format!("delete {}", state.id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, ResourceId, State};

    fn stored(resource_type: &str, name: &str) -> State {
        State::existing(ResourceId::new(resource_type, name), Default::default())
    }

    #[test]
    fn data_source_reads_do_not_change_the_device() {
        let mut plan = Plan::new();
        assert!(!plan.changes_device());

        plan.add(Effect::Read(
            Resource::new("firewall_address", "all").with_read_only(true),
        ));
        assert!(!plan.is_empty());
        assert!(!plan.changes_device());
        assert_eq!(plan.summary(), PlanSummary::default());
    }

    #[test]
    fn resets_are_counted_apart_from_deletes() {
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("firewall_address", "a")));
        plan.add(Effect::Reset(stored("system_global", "global")));
        plan.add(Effect::Delete(stored("firewall_policy", "old")));
        plan.add(Effect::Delete(stored("firewall_address", "b")));

        let summary = plan.summary();
        assert_eq!(
            summary,
            PlanSummary {
                create: 1,
                update: 0,
                reset: 1,
                delete: 2,
            }
        );
        assert!(plan.changes_device());
        assert_eq!(
            summary.to_string(),
            "1 to add, 0 to change, 1 to reset, 2 to destroy"
        );

        let no_resets = PlanSummary {
            delete: 1,
            ..Default::default()
        };
        assert_eq!(no_resets.to_string(), "0 to add, 0 to change, 1 to destroy");
    }

    #[test]
    fn describe_names_the_mkey_of_deleted_objects() {
        let state = stored("firewall_policy", "web").with_identifier("7");
        assert_eq!(
            describe(&Effect::Delete(state)),
            "delete firewall_policy.web (mkey 7)"
        );
        assert_eq!(
            describe(&Effect::Reset(stored("system_global", "global"))),
            "reset system_global.global"
        );
    }
}
