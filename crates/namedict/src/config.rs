use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordinator::CoordinatorSettings;
use crate::error::{CoreError, CoreResult};
use crate::sync::webdav::DEFAULT_TIMEOUT_SECS;

pub const CONFIG_FILENAME: &str = "namedict.json";
pub const CONFIG_VERSION: &str = "1.0.0";
pub const DATA_DIR_ENV: &str = "NAMEDICT_DATA_DIR";

pub const DEFAULT_AUTO_UPLOAD_DELAY_MS: u64 = 30_000;
pub const DEFAULT_SCROLL_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedictConfig {
    pub version: String,
    /// Directory holding `dict.json` and `index.json`.
    pub data_dir: PathBuf,
    pub auto_upload_delay_ms: u64,
    pub scroll_debounce_ms: u64,
    pub http_timeout_secs: u64,
}

impl Default for NamedictConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            data_dir: PathBuf::from("data"),
            auto_upload_delay_ms: DEFAULT_AUTO_UPLOAD_DELAY_MS,
            scroll_debounce_ms: DEFAULT_SCROLL_DEBOUNCE_MS,
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NamedictConfig {
    /// Bundle directory; relative paths resolve against the workspace.
    pub fn resolve_data_dir(&self, workspace: &Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            workspace.join(&self.data_dir)
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            auto_upload_delay: Duration::from_millis(self.auto_upload_delay_ms),
            scroll_debounce: Duration::from_millis(self.scroll_debounce_ms),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
    }
}

pub fn load_or_create_config(dir: &Path) -> CoreResult<NamedictConfig> {
    let mut config = read_or_create(dir)?;
    config.apply_env();
    Ok(config)
}

fn read_or_create(dir: &Path) -> CoreResult<NamedictConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        CoreError::Internal(format!(
            "failed to create workspace directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = config_path(dir);
    if !path.exists() {
        let config = NamedictConfig::default();
        write_config(&path, &config)?;
        return Ok(config);
    }

    let data = std::fs::read_to_string(&path).map_err(|error| {
        CoreError::Internal(format!("failed to read config {}: {error}", path.display()))
    })?;
    serde_json::from_str(&data).map_err(|error| {
        CoreError::InvalidInput(format!("failed to parse config {}: {error}", path.display()))
    })
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

pub fn write_config(path: &Path, config: &NamedictConfig) -> CoreResult<()> {
    let data = serde_json::to_string_pretty(config)
        .map_err(|error| CoreError::Internal(format!("failed to serialize config: {error}")))?;
    std::fs::write(path, data).map_err(|error| {
        CoreError::Internal(format!("failed to write config {}: {error}", path.display()))
    })
}
