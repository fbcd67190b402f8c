//! State lock held while a command changes a FortiGate
//!
//! The lock records which device and vdom the holder is changing, so a
//! blocked run can tell the user what it is waiting for.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minutes after which an unreleased lock may be taken over
pub const LOCK_TTL_MINUTES: i64 = 15;

/// FortiGate (and vdom) a locked command is changing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockTarget {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdom: Option<String>,
}

impl LockTarget {
    pub fn new(host: impl Into<String>, vdom: Option<String>) -> Self {
        Self {
            host: host.into(),
            vdom: vdom.filter(|v| !v.is_empty()),
        }
    }
}

impl fmt::Display for LockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vdom {
            Some(vdom) => write!(f, "{} (vdom {})", self.host, vdom),
            None => write!(f, "{}", self.host),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    /// CLI command holding the lock ("apply", "destroy", ...)
    pub command: String,
    /// user@hostname of the holding process
    pub holder: String,
    pub target: LockTarget,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn acquire(command: impl Into<String>, target: LockTarget) -> Self {
        Self::with_ttl(command, target, Duration::minutes(LOCK_TTL_MINUTES))
    }

    pub fn with_ttl(command: impl Into<String>, target: LockTarget, ttl: Duration) -> Self {
        let acquired_at = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            command: command.into(),
            holder: lock_holder(),
            target,
            acquired_at,
            expires_at: acquired_at + ttl,
        }
    }

    pub fn is_stale(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Time until the lock goes stale; zero once it has
    pub fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).max(Duration::zero())
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} running `{}` against {}",
            self.holder, self.command, self.target
        )
    }
}

fn lock_holder() -> String {
    let user = ["USER", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .unwrap_or_else(|| "unknown".to_string());
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}@{}", user, host)
}
