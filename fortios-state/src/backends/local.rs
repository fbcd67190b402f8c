//! Local file backend for state storage
//!
//! Stores state in a JSON file (default: fortios.state.json) next to a
//! `.lock` file created exclusively while a command holds the state.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::{LockInfo, LockTarget};
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "fortios.state.json";

    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        match config {
            BackendConfig::Local { path } => Self::with_path(path.clone()),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    async fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        let Some(content) = read_optional(&self.lock_path).await? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| BackendError::Corrupt {
                path: self.lock_path.clone(),
                source,
            })
    }

    async fn remove_lock(&self) -> BackendResult<()> {
        tokio::fs::remove_file(&self.lock_path)
            .await
            .map_err(BackendError::io("remove", &self.lock_path))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let Some(content) = read_optional(&self.state_path).await? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| BackendError::Corrupt {
                path: self.state_path.clone(),
                source,
            })
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(existing) = self.read_state().await?
            && existing.lineage != state.lineage
        {
            return Err(BackendError::LineageMismatch {
                stored: existing.lineage,
                writing: state.lineage.clone(),
            });
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|source| BackendError::Encode { what: "state", source })?;
        tokio::fs::write(&self.state_path, content)
            .await
            .map_err(BackendError::io("write", &self.state_path))?;

        log::debug!(
            "wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, command: &str, target: &LockTarget) -> BackendResult<LockInfo> {
        match self.read_lock().await {
            Ok(Some(existing)) if !existing.is_stale() => {
                return Err(BackendError::locked(existing));
            }
            Ok(Some(existing)) => {
                log::warn!("taking over stale lock {} ({})", existing.id, existing);
                self.remove_lock().await?;
            }
            Ok(None) => {}
            Err(e @ BackendError::Corrupt { .. }) => {
                log::warn!("removing unreadable lock file: {}", e);
                self.remove_lock().await?;
            }
            Err(e) => return Err(e),
        }

        let lock = LockInfo::acquire(command, target.clone());
        let content = serde_json::to_string_pretty(&lock)
            .map_err(|source| BackendError::Encode { what: "lock", source })?;

        // create_new fails if another process won the race since the check above
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => BackendError::LockContended,
                _ => BackendError::io("create", &self.lock_path)(e),
            })?;
        file.write_all(content.as_bytes())
            .await
            .map_err(BackendError::io("write", &self.lock_path))?;
        file.flush()
            .await
            .map_err(BackendError::io("write", &self.lock_path))?;

        log::debug!("locked state for {}", lock);
        Ok(lock)
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let Some(existing) = self.read_lock().await? else {
            return Err(BackendError::LockNotFound(lock.id.clone()));
        };

        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }

        self.remove_lock().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        match self.read_lock().await {
            Ok(None) => return Err(BackendError::LockNotFound(lock_id.to_string())),
            Ok(Some(existing)) if existing.id != lock_id => {
                return Err(BackendError::LockMismatch {
                    expected: lock_id.to_string(),
                    actual: existing.id,
                });
            }
            Ok(Some(_)) | Err(BackendError::Corrupt { .. }) => {}
            Err(e) => return Err(e),
        }
        self.remove_lock().await
    }
}

/// File contents, or `None` when the file does not exist yet
async fn read_optional(path: &Path) -> BackendResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BackendError::io("read", path)(e)),
    }
}
