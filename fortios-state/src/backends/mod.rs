//! Backend implementations for state storage

mod local;

pub use local::LocalBackend;

use crate::backend::{BackendConfig, BackendResult, StateBackend};

/// Open the backend a `state` setting points at
pub async fn create_backend(setting: &str) -> BackendResult<Box<dyn StateBackend>> {
    let backend = LocalBackend::from_config(&BackendConfig::parse(setting)?);
    log::debug!("state at {}", backend.state_path().display());
    Ok(Box::new(backend))
}
