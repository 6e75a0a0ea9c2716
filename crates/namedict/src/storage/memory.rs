//! In-memory storage, used by tests and ephemeral sessions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::storage::Storage;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn join_keys(keys: &[&str]) -> CoreResult<String> {
    if keys.is_empty() {
        return Err(CoreError::InvalidInput("storage keys empty".to_string()));
    }
    Ok(keys.join("/"))
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn write(&self, keys: &[&str], data: &Value) -> CoreResult<()> {
        let key = join_keys(keys)?;
        self.documents.write().insert(key, data.clone());
        Ok(())
    }

    async fn read(&self, keys: &[&str]) -> CoreResult<Option<Value>> {
        let key = join_keys(keys)?;
        Ok(self.documents.read().get(&key).cloned())
    }
}
