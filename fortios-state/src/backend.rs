//! Where the state file lives and how it is guarded

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::lock::{LockInfo, LockTarget};
use crate::state::StateFile;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(
        "State is locked by {lock} (lock ID: {}, {} min left)",
        .lock.id,
        .lock.remaining().num_minutes()
    )]
    Locked { lock: Box<LockInfo> },

    /// Another process created the lock file between our check and create
    #[error("State lock was taken by another process")]
    LockContended,

    #[error("No state lock with ID {0}")]
    LockNotFound(String),

    #[error("State lock is {actual}, not {expected}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported state location '{0}': only local files are supported")]
    UnsupportedBackend(String),

    #[error("Invalid state setting: {0}")]
    Configuration(String),

    #[error("{} is not valid JSON: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The stored state was written for a different lineage
    #[error("State lineage mismatch: stored {stored}, writing {writing}")]
    LineageMismatch { stored: String, writing: String },

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl BackendError {
    pub fn locked(lock: LockInfo) -> Self {
        Self::Locked {
            lock: Box::new(lock),
        }
    }

    /// Build a `map_err` adapter for I/O on `path`
    pub fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> BackendError {
        let path = path.to_path_buf();
        move |source| BackendError::Io {
            action,
            path,
            source,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage for the state file, with locking against concurrent runs
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state; `None` when nothing has been stored yet
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state. Callers increment the serial first.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Lock the state for `command`, which is about to change `target`.
    ///
    /// Fails while another lock is held and not yet stale.
    async fn acquire_lock(&self, command: &str, target: &LockTarget) -> BackendResult<LockInfo>;

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove a lock by ID regardless of holder
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;
}

/// Location of the state, parsed from the `state` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Local { path: PathBuf },
}

impl BackendConfig {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        BackendConfig::Local { path: path.into() }
    }

    /// Parse a `state` setting: a plain path or a `file://` URL
    pub fn parse(setting: &str) -> BackendResult<Self> {
        let setting = setting.trim();
        if setting.is_empty() {
            return Err(BackendError::Configuration("state path is empty".to_string()));
        }
        match setting.split_once("://") {
            None => Ok(Self::local(setting)),
            Some(("file", "")) => Err(BackendError::Configuration(
                "file:// URL has no path".to_string(),
            )),
            Some(("file", path)) => Ok(Self::local(path)),
            Some((scheme, _)) => Err(BackendError::UnsupportedBackend(scheme.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_error_names_device_and_holder() {
        let lock = LockInfo::acquire("destroy", LockTarget::new("fw01", None));
        let id = lock.id.clone();
        let message = BackendError::locked(lock).to_string();
        assert!(message.contains("running `destroy` against fw01"));
        assert!(message.contains(&id));
    }

    #[test]
    fn parse_state_setting() {
        assert_eq!(
            BackendConfig::parse("site-a.state.json").unwrap(),
            BackendConfig::local("site-a.state.json")
        );
        assert_eq!(
            BackendConfig::parse("file:///var/lib/fortios/state.json").unwrap(),
            BackendConfig::local("/var/lib/fortios/state.json")
        );
        assert!(matches!(
            BackendConfig::parse("s3://bucket/key"),
            Err(BackendError::UnsupportedBackend(scheme)) if scheme == "s3"
        ));
        assert!(matches!(
            BackendConfig::parse("  "),
            Err(BackendError::Configuration(_))
        ));
        assert!(matches!(
            BackendConfig::parse("file://"),
            Err(BackendError::Configuration(_))
        ));
    }
}
