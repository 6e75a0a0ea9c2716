//! Loading the dictionary bundle.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dictionary::bundle::{ENTRIES_FILE_NAME, INDEX_FILE_NAME};
use dictionary::Dictionary;

use crate::error::{CoreError, CoreResult};

#[async_trait]
pub trait DictionaryLoader: Send + Sync {
    async fn load_all(&self) -> CoreResult<Arc<Dictionary>>;
}

/// Reads the bundle from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileLoader {
    data_dir: PathBuf,
}

impl FileLoader {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    async fn read(&self, file_name: &str) -> CoreResult<Vec<u8>> {
        let path = self.data_dir.join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|error| CoreError::Load(format!("failed to read {}: {error}", path.display())))
    }

    async fn read_optional(&self, file_name: &str) -> CoreResult<Option<Vec<u8>>> {
        let path = self.data_dir.join(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(CoreError::Load(format!(
                "failed to read {}: {error}",
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl DictionaryLoader for FileLoader {
    async fn load_all(&self) -> CoreResult<Arc<Dictionary>> {
        let entries = self.read(ENTRIES_FILE_NAME).await?;
        let index = self.read_optional(INDEX_FILE_NAME).await?;
        if index.is_none() {
            tracing::info!("no {INDEX_FILE_NAME} in bundle; deriving the index from records");
        }
        let dictionary = tokio::task::spawn_blocking(move || match index {
            Some(index) => Dictionary::from_json(&entries, &index),
            None => Dictionary::from_entries_json(&entries),
        })
        .await
            .map_err(|error| CoreError::Internal(format!("dictionary parse task failed: {error}")))??;
        tracing::info!("loaded {} dictionary entries", dictionary.len());
        Ok(Arc::new(dictionary))
    }
}
