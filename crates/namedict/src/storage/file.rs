//! JSON documents on disk, one file per key path.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::storage::Storage;

const DOCUMENT_EXTENSION: &str = "json";
const STAGING_EXTENSION: &str = "json.tmp";

/// Maps `["prefs", "view"]` to `<root>/prefs/view.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn document_path(&self, keys: &[&str]) -> CoreResult<PathBuf> {
        if keys.is_empty() {
            return Err(CoreError::InvalidInput("storage keys empty".to_string()));
        }
        let mut path = self.root.clone();
        for key in keys {
            check_segment(key)?;
            path.push(key);
        }
        path.set_extension(DOCUMENT_EXTENSION);
        Ok(path)
    }
}

fn check_segment(key: &str) -> CoreResult<()> {
    let traversal = matches!(key, "" | "." | "..");
    if traversal || key.contains(['/', '\\']) {
        return Err(CoreError::InvalidInput(format!("invalid storage key {key:?}")));
    }
    Ok(())
}

fn io_error(action: &str, path: &Path, error: io::Error) -> CoreError {
    CoreError::Storage(format!("failed to {action} {}: {error}", path.display()))
}

#[async_trait]
impl Storage for FileStorage {
    async fn write(&self, keys: &[&str], data: &Value) -> CoreResult<()> {
        let path = self.document_path(keys)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|error| io_error("create directory", dir, error))?;
        }
        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|error| CoreError::Storage(format!("failed to encode document: {error}")))?;

        // Staged write, renamed over the target.
        let staging = path.with_extension(STAGING_EXTENSION);
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|error| io_error("write", &staging, error))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|error| io_error("replace", &path, error))
    }

    async fn read(&self, keys: &[&str]) -> CoreResult<Option<Value>> {
        let path = self.document_path(keys)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|error| {
                CoreError::Storage(format!("corrupt document {}: {error}", path.display()))
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error("read", &path, error)),
        }
    }
}
