//! FortiOS State Management
//!
//! Persists the refreshed state of every managed FortiOS object between CLI
//! runs, with a lock file guarding against concurrent runs.
//!
//! - **StateFile**: lineage, serial and the stored resources
//! - **StateBackend**: storage trait (currently a local JSON file)
//! - **LockInfo**: who holds the state, for which device, and until when

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::{LockInfo, LockTarget};
pub use state::{ResourceState, StateFile};
