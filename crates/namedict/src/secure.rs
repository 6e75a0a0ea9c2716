//! Storage for the sync secret, kept apart from the plain preference store.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{CoreError, CoreResult};

#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Stored secret, or an empty string when none is stored.
    async fn read_secret(&self) -> CoreResult<String>;
    async fn write_secret(&self, secret: &str) -> CoreResult<()>;
    async fn clear_secret(&self) -> CoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemorySecureStore {
    secret: Mutex<String>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(secret: &str) -> Self {
        Self {
            secret: Mutex::new(secret.to_string()),
        }
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn read_secret(&self) -> CoreResult<String> {
        Ok(self.secret.lock().clone())
    }

    async fn write_secret(&self, secret: &str) -> CoreResult<()> {
        *self.secret.lock() = secret.to_string();
        Ok(())
    }

    async fn clear_secret(&self) -> CoreResult<()> {
        self.secret.lock().clear();
        Ok(())
    }
}

/// Secret file readable only by the owning user.
#[derive(Debug, Clone)]
pub struct FileSecureStore {
    path: PathBuf,
}

impl FileSecureStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn read_secret(&self) -> CoreResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(secret) => Ok(secret),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(error) => Err(CoreError::Storage(format!(
                "failed to read secret {}: {error}",
                self.path.display()
            ))),
        }
    }

    async fn write_secret(&self, secret: &str) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                CoreError::Storage(format!(
                    "failed to create secret directory {}: {error}",
                    parent.display()
                ))
            })?;
        }
        tokio::fs::write(&self.path, secret).await.map_err(|error| {
            CoreError::Storage(format!(
                "failed to write secret {}: {error}",
                self.path.display()
            ))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|error| {
                    CoreError::Storage(format!("failed to restrict secret permissions: {error}"))
                })?;
        }
        Ok(())
    }

    async fn clear_secret(&self) -> CoreResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(CoreError::Storage(format!(
                "failed to remove secret {}: {error}",
                self.path.display()
            ))),
        }
    }
}
