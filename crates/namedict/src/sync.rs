pub mod webdav;

use std::fmt;

use async_trait::async_trait;
use dictionary::RecordId;
use serde::{Deserialize, Serialize};

use crate::naming::NamingScheme;

pub use webdav::WebDavClient;

pub const FOLDER_NAME: &str = "NamingDict";
pub const FAVORITES_FILE_NAME: &str = "favorites.json";
pub const NAME_PLANS_FILE_NAME: &str = "name_plans.json";
pub const PAYLOAD_VERSION: u32 = 1;

/// Remote endpoint and credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SyncConfig {
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.server_url.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.password.trim().is_empty()
    }

    pub fn is_blank_endpoint(&self) -> bool {
        self.server_url.trim().is_empty()
    }

    pub fn is_https(&self) -> bool {
        self.server_url
            .trim()
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
    }

    /// Rejects a configured endpoint that does not use TLS. A blank endpoint
    /// passes here and is reported as incomplete instead.
    pub fn check_transport(&self) -> Result<(), SyncError> {
        if self.is_blank_endpoint() || self.is_https() {
            Ok(())
        } else {
            Err(SyncError::InsecureTransport)
        }
    }

    pub fn folder_url(&self) -> String {
        let base = self.server_url.trim().trim_end_matches('/');
        format!("{base}/{FOLDER_NAME}")
    }

    pub fn file_url(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.folder_url())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FavoritesPayload {
    pub version: u32,
    pub updated_at: i64,
    pub favorite_order: Vec<RecordId>,
}

impl FavoritesPayload {
    pub fn new(updated_at: i64, favorite_order: Vec<RecordId>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            updated_at,
            favorite_order,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamePlansPayload {
    pub version: u32,
    pub updated_at: i64,
    pub surname: String,
    pub schemes: Vec<NamingScheme>,
}

impl NamePlansPayload {
    pub fn new(updated_at: i64, surname: String, schemes: Vec<NamingScheme>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            updated_at,
            surname,
            schemes,
        }
    }
}

/// Result of an upload as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

impl SyncOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Non-success HTTP status grouped by what the user can do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Auth,
    Permission,
    NotFound,
    PathConflict,
    Other(u16),
}

impl RemoteStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            401 => RemoteStatus::Auth,
            403 => RemoteStatus::Permission,
            404 => RemoteStatus::NotFound,
            409 => RemoteStatus::PathConflict,
            other => RemoteStatus::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            RemoteStatus::Auth => 401,
            RemoteStatus::Permission => 403,
            RemoteStatus::NotFound => 404,
            RemoteStatus::PathConflict => 409,
            RemoteStatus::Other(code) => code,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStatus::Auth => write!(f, "authentication failed (401)"),
            RemoteStatus::Permission => write!(f, "permission denied (403)"),
            RemoteStatus::NotFound => write!(f, "remote file not found (404)"),
            RemoteStatus::PathConflict => write!(f, "folder missing or path conflict (409)"),
            RemoteStatus::Other(code) => write!(f, "HTTP {code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("sync configuration is incomplete")]
    ConfigIncomplete,
    #[error("sync server must use HTTPS (https://)")]
    InsecureTransport,
    #[error("sync already in progress, try again later")]
    Busy,
    #[error("{0}")]
    RemoteStatus(RemoteStatus),
    #[error("network error: {0}")]
    Transport(String),
    #[error("invalid remote content: {0}")]
    Payload(String),
}

/// Remote store for the favorites and name-plans documents.
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// Creates the sync folder; an already existing folder is success.
    async fn ensure_folder(&self, config: &SyncConfig) -> Result<(), SyncError>;
    async fn upload_favorites(&self, config: &SyncConfig, payload: &FavoritesPayload)
        -> SyncOutcome;
    async fn upload_name_plans(
        &self,
        config: &SyncConfig,
        payload: &NamePlansPayload,
    ) -> SyncOutcome;
    async fn download_favorites(&self, config: &SyncConfig)
        -> Result<FavoritesPayload, SyncError>;
    /// `Ok(None)` when the remote has no name-plans document yet.
    async fn download_name_plans(
        &self,
        config: &SyncConfig,
    ) -> Result<Option<NamePlansPayload>, SyncError>;
}
