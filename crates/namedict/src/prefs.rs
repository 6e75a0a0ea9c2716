//! User preferences persisted between sessions.
//!
//! Each field group lives in its own JSON document under `prefs/`, so a
//! write touches only the group that changed. The sync secret is never
//! stored here; it goes through a [`SecureStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dictionary::RecordId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::naming::NamingDraft;
use crate::secure::SecureStore;
use crate::storage::SharedStorage;
use crate::sync::SyncConfig;

const PREFS_NAMESPACE: &str = "prefs";
const FAVORITES_DOC: &str = "favorites";
const FILTER_DOC: &str = "filter";
const MAIN_SCROLL_DOC: &str = "scroll_main";
const FAVORITES_SCROLL_DOC: &str = "scroll_favorites";
const VIEW_DOC: &str = "view";
const SYNC_DOC: &str = "sync";
const NAMING_DOC: &str = "naming";

/// Restorable position inside one of the entry lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrollAnchor {
    pub anchor_id: Option<RecordId>,
    pub offset_px: u32,
}

impl ScrollAnchor {
    /// Builds an anchor, clamping negative offsets to zero.
    pub fn new(anchor_id: Option<RecordId>, offset_px: i64) -> Self {
        Self {
            anchor_id,
            offset_px: offset_px.clamp(0, i64::from(u32::MAX)) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollList {
    Main,
    Favorites,
}

impl ScrollList {
    fn doc(self) -> &'static str {
        match self {
            ScrollList::Main => MAIN_SCROLL_DOC,
            ScrollList::Favorites => FAVORITES_SCROLL_DOC,
        }
    }
}

/// Everything restored at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefsSnapshot {
    pub favorite_order: Vec<RecordId>,
    pub selected_category_key: Option<String>,
    pub selected_values: BTreeMap<String, Vec<String>>,
    pub main_scroll: ScrollAnchor,
    pub favorites_scroll: ScrollAnchor,
    pub favorites_only: bool,
    pub sync_config: SyncConfig,
    pub naming: NamingDraft,
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Reads every group; absent or unreadable groups fall back to defaults.
    async fn read_snapshot(&self) -> PrefsSnapshot;
    async fn write_favorite_order(&self, order: &[RecordId]) -> CoreResult<()>;
    async fn write_filter_state(
        &self,
        category_key: &str,
        selected_values: &BTreeMap<String, Vec<String>>,
    ) -> CoreResult<()>;
    async fn write_scroll_anchor(&self, list: ScrollList, anchor: ScrollAnchor) -> CoreResult<()>;
    async fn write_favorites_only(&self, enabled: bool) -> CoreResult<()>;
    async fn write_sync_config(&self, config: &SyncConfig) -> CoreResult<()>;
    async fn write_naming_draft(&self, draft: &NamingDraft) -> CoreResult<()>;
}

pub type SharedPersistence = Arc<dyn PersistenceStore>;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FavoritesDoc {
    favorite_order: Vec<RecordId>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FilterDoc {
    selected_category_key: Option<String>,
    selected_values: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ViewDoc {
    favorites_only: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SyncDoc {
    server_url: String,
    username: String,
    /// Plaintext secret written by older versions; migrated on read.
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

/// [`PersistenceStore`] over a JSON document [`Storage`](crate::storage::Storage).
pub struct StoragePrefs {
    storage: SharedStorage,
    secrets: Arc<dyn SecureStore>,
}

impl StoragePrefs {
    pub fn new(storage: SharedStorage, secrets: Arc<dyn SecureStore>) -> Self {
        Self { storage, secrets }
    }

    async fn read_doc<T: DeserializeOwned + Default>(&self, doc: &str) -> T {
        match self.storage.read(&[PREFS_NAMESPACE, doc]).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|error| {
                tracing::warn!("ignoring corrupt preference document {doc}: {error}");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(error) => {
                tracing::warn!("failed to read preference document {doc}: {error}");
                T::default()
            }
        }
    }

    async fn write_doc<T: Serialize>(&self, doc: &str, data: &T) -> CoreResult<()> {
        let value: Value = serde_json::to_value(data)
            .map_err(|error| CoreError::Storage(format!("failed to encode {doc}: {error}")))?;
        self.storage.write(&[PREFS_NAMESPACE, doc], &value).await
    }

    async fn read_sync_config(&self) -> SyncConfig {
        let mut doc: SyncDoc = self.read_doc(SYNC_DOC).await;
        if let Some(legacy) = doc.password.take() {
            self.migrate_legacy_secret(&legacy, &doc).await;
        }
        let password = self.secrets.read_secret().await.unwrap_or_else(|error| {
            tracing::warn!("failed to read sync secret: {error}");
            String::new()
        });
        SyncConfig {
            server_url: doc.server_url,
            username: doc.username,
            password,
        }
    }

    /// Moves a plaintext secret into the secure store. An existing secure
    /// secret is kept. The legacy field is only dropped once the secret is
    /// safe, so a failed migration is retried on the next read.
    async fn migrate_legacy_secret(&self, legacy: &str, doc: &SyncDoc) {
        if !legacy.is_empty() {
            let existing = match self.secrets.read_secret().await {
                Ok(existing) => existing,
                Err(error) => {
                    tracing::warn!("failed to migrate legacy sync secret: {error}");
                    return;
                }
            };
            if existing.is_empty() {
                if let Err(error) = self.secrets.write_secret(legacy).await {
                    tracing::warn!("failed to migrate legacy sync secret: {error}");
                    return;
                }
            }
        }
        if let Err(error) = self.write_doc(SYNC_DOC, doc).await {
            tracing::warn!("failed to drop legacy sync secret from preferences: {error}");
        } else {
            tracing::info!("migrated legacy sync secret into the secure store");
        }
    }
}

#[async_trait]
impl PersistenceStore for StoragePrefs {
    async fn read_snapshot(&self) -> PrefsSnapshot {
        let favorites: FavoritesDoc = self.read_doc(FAVORITES_DOC).await;
        let filter: FilterDoc = self.read_doc(FILTER_DOC).await;
        let main_scroll: ScrollAnchor = self.read_doc(MAIN_SCROLL_DOC).await;
        let favorites_scroll: ScrollAnchor = self.read_doc(FAVORITES_SCROLL_DOC).await;
        let view: ViewDoc = self.read_doc(VIEW_DOC).await;
        let naming: NamingDraft = self.read_doc(NAMING_DOC).await;
        let sync_config = self.read_sync_config().await;

        PrefsSnapshot {
            favorite_order: favorites.favorite_order,
            selected_category_key: filter.selected_category_key,
            selected_values: filter.selected_values,
            main_scroll,
            favorites_scroll,
            favorites_only: view.favorites_only,
            sync_config,
            naming: naming.sanitized(),
        }
    }

    async fn write_favorite_order(&self, order: &[RecordId]) -> CoreResult<()> {
        let doc = FavoritesDoc {
            favorite_order: order.to_vec(),
        };
        self.write_doc(FAVORITES_DOC, &doc).await
    }

    async fn write_filter_state(
        &self,
        category_key: &str,
        selected_values: &BTreeMap<String, Vec<String>>,
    ) -> CoreResult<()> {
        let doc = FilterDoc {
            selected_category_key: Some(category_key.to_string()),
            selected_values: selected_values.clone(),
        };
        self.write_doc(FILTER_DOC, &doc).await
    }

    async fn write_scroll_anchor(&self, list: ScrollList, anchor: ScrollAnchor) -> CoreResult<()> {
        self.write_doc(list.doc(), &anchor).await
    }

    async fn write_favorites_only(&self, enabled: bool) -> CoreResult<()> {
        let doc = ViewDoc {
            favorites_only: enabled,
        };
        self.write_doc(VIEW_DOC, &doc).await
    }

    async fn write_sync_config(&self, config: &SyncConfig) -> CoreResult<()> {
        let doc = SyncDoc {
            server_url: config.server_url.trim().to_string(),
            username: config.username.trim().to_string(),
            password: None,
        };
        self.write_doc(SYNC_DOC, &doc).await?;
        if config.password.is_empty() {
            self.secrets.clear_secret().await
        } else {
            self.secrets.write_secret(&config.password).await
        }
    }

    async fn write_naming_draft(&self, draft: &NamingDraft) -> CoreResult<()> {
        self.write_doc(NAMING_DOC, draft).await
    }
}
