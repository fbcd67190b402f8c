//! FortiOS Provider implementation
//!
//! Resolves the schema of each resource type and drives the orchestrator,
//! translating lifecycle failures into provider errors for the host.

use fortios_core::Attributes;
use fortios_core::orchestrator::{Orchestrator, OrchestratorConfig, Outcome};
use fortios_core::provider::{ProviderError, ProviderResult};
use fortios_core::reconcile::SortMode;
use fortios_core::resource::{Resource, ResourceId, State};
use fortios_core::schema::ResourceSchema;
use fortios_core::transport::Transport;

use crate::client::{ClientConfig, FortiClient};
use crate::schemas;

/// FortiOS Provider
pub struct FortiosProvider<T: Transport = FortiClient> {
    orchestrator: Orchestrator<T>,
}

impl FortiosProvider<FortiClient> {
    /// Connect to a device and learn its firmware version.
    ///
    /// A device that does not report its version is treated as supporting
    /// every catalog field.
    pub async fn connect(config: &ClientConfig, sort: SortMode) -> ProviderResult<Self> {
        let client = FortiClient::new(config)
            .map_err(|e| ProviderError::new("Failed to create FortiOS client").with_cause(e))?;

        let mut capabilities = schemas::capabilities();
        match client.device_version().await {
            Ok(version) => capabilities.set_device_version(version),
            Err(e) => log::warn!("could not determine firmware version: {}", e),
        }

        Ok(Self::with_config(
            client,
            OrchestratorConfig {
                sort,
                capabilities,
                ..Default::default()
            },
        ))
    }
}

impl<T: Transport> FortiosProvider<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(
            transport,
            OrchestratorConfig {
                capabilities: schemas::capabilities(),
                ..Default::default()
            },
        )
    }

    pub fn with_config(transport: T, config: OrchestratorConfig) -> Self {
        Self {
            orchestrator: Orchestrator::with_config(transport, config),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<T> {
        &self.orchestrator
    }

    fn schema_for(&self, id: &ResourceId) -> ProviderResult<ResourceSchema> {
        schemas::get(&id.resource_type).ok_or_else(|| {
            ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                .for_resource(id.clone())
        })
    }

    fn finish(id: &ResourceId, outcome: Outcome) -> State {
        for diagnostic in outcome.diagnostics.iter() {
            log::warn!("{}: {}", id, diagnostic);
        }
        outcome.state
    }

    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &State,
    ) -> ProviderResult<State> {
        let schema = self.schema_for(id)?;
        let outcome = self
            .orchestrator
            .read(
                &schema,
                id,
                identifier,
                &prior.attributes,
                prior.vdom.as_deref(),
            )
            .await
            .map_err(|e| ProviderError::new(e.to_string()).for_resource(id.clone()))?;
        Ok(Self::finish(id, outcome))
    }

    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let schema = self.schema_for(&resource.id)?;
        let outcome = self
            .orchestrator
            .create(&schema, &resource)
            .await
            .map_err(|e| ProviderError::new(e.to_string()).for_resource(resource.id.clone()))?;
        Ok(Self::finish(&resource.id, outcome))
    }

    pub async fn update_resource(
        &self,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let schema = self.schema_for(&to.id)?;
        let outcome = self
            .orchestrator
            .update(&schema, identifier, from, &to)
            .await
            .map_err(|e| ProviderError::new(e.to_string()).for_resource(to.id.clone()))?;
        Ok(Self::finish(&to.id, outcome))
    }

    pub async fn delete_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> ProviderResult<()> {
        let schema = self.schema_for(id)?;
        self.orchestrator
            .delete(&schema, id, identifier, vdom)
            .await
            .map_err(|e| ProviderError::new(e.to_string()).for_resource(id.clone()))
    }

    pub async fn import_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        vdom: Option<&str>,
    ) -> ProviderResult<State> {
        let schema = self.schema_for(id)?;
        let outcome = self
            .orchestrator
            .import(&schema, id, identifier, vdom)
            .await
            .map_err(|e| ProviderError::new(e.to_string()).for_resource(id.clone()))?;
        Ok(Self::finish(id, outcome))
    }

    /// Read a data source: an existing object the configuration only observes
    pub async fn read_data_source(&self, resource: &Resource) -> ProviderResult<State> {
        let schema = self.schema_for(&resource.id)?;
        let identifier = data_source_identifier(&schema, &resource.attributes).ok_or_else(|| {
            ProviderError::new(format!(
                "Data source must set '{}'",
                schema.mkey.as_deref().unwrap_or("")
            ))
            .for_resource(resource.id.clone())
        })?;
        self.import_resource(&resource.id, &identifier, resource.vdom.as_deref())
            .await
    }
}

fn data_source_identifier(schema: &ResourceSchema, attributes: &Attributes) -> Option<String> {
    match schema.mkey.as_deref() {
        None => Some(schema.resource_type.clone()),
        Some(mkey) => attributes
            .get(mkey)
            .map(|v| v.key_string())
            .filter(|s| !s.is_empty()),
    }
}
