pub mod error;
pub mod config;
pub mod utils;

pub mod storage;
pub mod secure;
pub mod prefs;
pub mod loader;

pub mod naming;
pub mod sync;
pub mod coordinator;

pub use crate::config::NamedictConfig;
pub use crate::coordinator::{
    CoordinatorDeps, CoordinatorSettings, DictSnapshot, LoadState, StateCoordinator, SyncState,
};
pub use crate::error::{CoreError, CoreResult};
pub use crate::prefs::{PersistenceStore, StoragePrefs};
pub use crate::sync::{SyncClient, SyncConfig, SyncError};
