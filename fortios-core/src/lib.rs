//! FortiOS Core
//!
//! Schema-driven engine that moves FortiOS configuration objects between the
//! device's JSON wire format and typed configuration state.

pub mod builder;
pub mod capability;
pub mod coerce;
pub mod diagnostics;
pub mod differ;
pub mod effect;
pub mod marshal;
pub mod orchestrator;
pub mod plan;
pub mod provider;
pub mod reconcile;
pub mod resource;
pub mod schema;
pub mod transport;

pub use resource::{Attributes, Resource, ResourceId, State, Value, WireObject};
