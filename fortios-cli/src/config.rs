//! Configuration file loading
//!
//! The configuration file is JSON:
//!
//! ```json
//! {
//!   "provider": { "host": "fw01.example.net", "vdom": "root" },
//!   "resources": [
//!     { "type": "firewall_address", "name": "web", "attributes": { "subnet": "10.0.0.0/24" } }
//!   ]
//! }
//! ```
//!
//! Connection settings resolve flags first, then environment variables
//! (both handled by clap), then the file's `provider` block.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fortios_core::reconcile::{self, SortMode};
use fortios_core::resource::attributes_from_json;
use fortios_core::schema::TypeError;
use fortios_core::{Resource, ResourceId};
use fortios_provider::{ClientConfig, TlsMode, schemas};
use fortios_state::{LocalBackend, LockTarget};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No {setting} configured; pass --{flag}, set {env}, or add it to the provider block")]
    MissingSetting {
        setting: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("Invalid sort mode: {0}")]
    InvalidSort(String),

    #[error("Duplicate resource: {0}")]
    DuplicateResource(ResourceId),

    #[error("{}", .0.join("\n"))]
    Invalid(Vec<String>),
}

/// Connection and engine settings from any source
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSettings {
    pub host: Option<String>,
    pub token: Option<String>,
    pub vdom: Option<String>,
    pub insecure: Option<bool>,
    pub ca_cert: Option<PathBuf>,
    pub retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub state: Option<PathBuf>,
    pub sort: Option<String>,
}

impl ProviderSettings {
    /// Fill every unset value from `fallback`
    pub fn or(self, fallback: ProviderSettings) -> Self {
        Self {
            host: self.host.or(fallback.host),
            token: self.token.or(fallback.token),
            vdom: self.vdom.or(fallback.vdom),
            insecure: self.insecure.or(fallback.insecure),
            ca_cert: self.ca_cert.or(fallback.ca_cert),
            retries: self.retries.or(fallback.retries),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
            state: self.state.or(fallback.state),
            sort: self.sort.or(fallback.sort),
        }
    }

    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingSetting {
                setting: "host",
                flag: "host",
                env: "FORTIOS_HOST",
            })?;
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingSetting {
                setting: "API token",
                flag: "token",
                env: "FORTIOS_TOKEN",
            })?;

        let mut config = ClientConfig::new(host, token);
        if let Some(vdom) = &self.vdom {
            config = config.with_vdom(vdom.as_str());
        }
        if let Some(retries) = self.retries {
            config = config.with_retries(retries);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config = config.with_tls(match (&self.ca_cert, self.insecure) {
            (Some(path), _) => TlsMode::CustomCa(path.clone()),
            (None, Some(true)) => TlsMode::DangerAcceptInvalid,
            _ => TlsMode::System,
        });
        Ok(config)
    }

    pub fn sort_mode(&self) -> Result<SortMode, ConfigError> {
        match &self.sort {
            Some(s) => s.parse().map_err(ConfigError::InvalidSort),
            None => Ok(SortMode::default()),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.state
            .clone()
            .unwrap_or_else(|| PathBuf::from(LocalBackend::DEFAULT_STATE_FILE))
    }

    /// Device a state lock is taken for
    pub fn lock_target(&self) -> LockTarget {
        LockTarget::new(
            self.host.clone().unwrap_or_else(|| "unknown host".to_string()),
            self.vdom.clone(),
        )
    }
}

/// One resource block of the configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub vdom: Option<String>,
    /// Observe an existing object without managing it
    #[serde(default)]
    pub data: bool,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceConfig {
    fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub provider: ProviderSettings,
    pub resources: Vec<ResourceConfig>,
}

impl ConfigFile {
    /// Load the configuration file. A missing file is an empty configuration
    /// unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} not found, using an empty configuration", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate every resource against its schema and convert it to the
    /// canonical form the engine compares with refreshed state.
    ///
    /// Managed resources gain their schema defaults; data sources only need
    /// their identity field.
    pub fn desired_resources(&self, sort: SortMode) -> Result<Vec<Resource>, ConfigError> {
        let mut seen = HashSet::new();
        let mut errors = Vec::new();
        let mut resources = Vec::new();

        for config in &self.resources {
            let id = config.id();
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateResource(id));
            }

            let Some(schema) = schemas::get(&config.resource_type) else {
                errors.push(format!("{}: Unknown resource type", id));
                continue;
            };

            let attributes = attributes_from_json(&config.attributes);
            if let Err(field_errors) = schema.validate(&attributes) {
                errors.extend(
                    field_errors
                        .into_iter()
                        .filter(|e| {
                            !(config.data && matches!(e, TypeError::MissingRequired { .. }))
                        })
                        .map(|e| format!("{}: {}", id, e)),
                );
            }
            if config.data
                && let Some(mkey) = &schema.mkey
                && !attributes.contains_key(mkey)
            {
                errors.push(format!("{}: data source must set '{}'", id, mkey));
            }

            let attributes = if config.data {
                attributes
            } else {
                schema.with_defaults(&attributes)
            };

            let mut resource = Resource::new(&config.resource_type, &config.name)
                .with_read_only(config.data);
            resource.attributes = reconcile::canonicalize(&attributes, &schema, sort);
            if let Some(vdom) = &config.vdom {
                resource = resource.with_vdom(vdom.as_str());
            }
            resources.push(resource);
        }

        if errors.is_empty() {
            Ok(resources)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
