//! FortiOS Provider
//!
//! REST transport and resource catalog for the FortiOS engine.
//!
//! ## Module Structure
//!
//! - `client` - reqwest-based CMDB client implementing `Transport`
//! - `provider` - FortiosProvider implementation
//! - `schemas` - Resource schema catalog and firmware capability table

pub mod client;
pub mod provider;
pub mod schemas;

// Re-export main types
pub use client::{ClientConfig, ClientError, FortiClient, TlsMode};
pub use provider::FortiosProvider;

use fortios_core::provider::{Provider, ProviderResult};
use fortios_core::resource::{Resource, ResourceId, State};
use fortios_core::schema::ResourceSchema;
use fortios_core::transport::{BoxFuture, Transport};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl<T: Transport> Provider for FortiosProvider<T> {
    fn name(&self) -> &'static str {
        "fortios"
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        schemas::all_schemas()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &State,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let prior = prior.clone();
        Box::pin(async move { self.read_resource(&id, &identifier, &prior).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            if resource.is_data_source() {
                self.read_data_source(&resource).await
            } else {
                self.create_resource(resource).await
            }
        })
    }

    fn update(
        &self,
        _id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&identifier, &from, to).await })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let vdom = vdom.map(str::to_string);
        Box::pin(async move {
            self.delete_resource(&id, &identifier, vdom.as_deref())
                .await
        })
    }

    fn import(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let vdom = vdom.map(str::to_string);
        Box::pin(async move {
            self.import_resource(&id, &identifier, vdom.as_deref())
                .await
        })
    }
}
