pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::CoreResult;

/// Durable JSON document store addressed by a key path.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn write(&self, keys: &[&str], data: &Value) -> CoreResult<()>;
    async fn read(&self, keys: &[&str]) -> CoreResult<Option<Value>>;
}

pub type SharedStorage = Arc<dyn Storage>;

pub use file::FileStorage;
pub use memory::MemoryStorage;
