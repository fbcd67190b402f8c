//! Provider - Trait the host drives resource lifecycles through
//!
//! A Provider knows the schemas of its resource types and turns plan effects
//! into device operations. The FortiOS provider implements it on top of the
//! [`Orchestrator`](crate::orchestrator::Orchestrator).

use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;
use crate::transport::BoxFuture;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Main Provider trait
///
/// All operations are async and involve side effects. `identifier` is the
/// device-side identity (the object's mkey, or the resource type for global
/// settings).
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "fortios")
    fn name(&self) -> &'static str;

    /// Schemas of the resource types this Provider can handle
    fn schemas(&self) -> Vec<ResourceSchema>;

    fn schema(&self, resource_type: &str) -> Option<ResourceSchema> {
        self.schemas()
            .into_iter()
            .find(|s| s.resource_type == resource_type)
    }

    /// Refresh a resource against its prior state.
    ///
    /// Returns `State::not_found()` if the device no longer has it.
    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &State,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource; the returned state carries its identifier
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource, or reset a global setting to its defaults
    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Read an existing device object into fresh state, every field included
    fn import(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        (**self).schemas()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &State,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier, prior)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier, vdom)
    }

    fn import(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, identifier, vdom)
    }
}
