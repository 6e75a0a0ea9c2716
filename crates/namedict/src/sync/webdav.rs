//! WebDAV transport for [`SyncClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::sync::{
    FavoritesPayload, NamePlansPayload, RemoteStatus, SyncClient, SyncConfig, SyncError,
    SyncOutcome, FAVORITES_FILE_NAME, NAME_PLANS_FILE_NAME,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct WebDavClient {
    http: reqwest::Client,
}

impl WebDavClient {
    pub fn new(timeout: Duration) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self { http })
    }

    fn request(&self, method: Method, url: &str, config: &SyncConfig) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&config.username, Some(&config.password))
    }

    async fn put_json<T: Serialize + Sync>(
        &self,
        config: &SyncConfig,
        file_name: &str,
        payload: &T,
    ) -> Result<(), SyncError> {
        if !config.is_complete() {
            return Err(SyncError::ConfigIncomplete);
        }
        let body = serde_json::to_vec(payload)
            .map_err(|e| SyncError::Payload(format!("failed to encode payload: {e}")))?;
        let response = self
            .request(Method::PUT, &config.file_url(file_name), config)
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::RemoteStatus(RemoteStatus::from_code(status.as_u16())))
        }
    }

    /// GETs a JSON document; `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        config: &SyncConfig,
        file_name: &str,
    ) -> Result<Option<T>, SyncError> {
        if !config.is_complete() {
            return Err(SyncError::ConfigIncomplete);
        }
        let response = self
            .request(Method::GET, &config.file_url(file_name), config)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::RemoteStatus(RemoteStatus::from_code(status.as_u16())));
        }
        let text = response.text().await.map_err(transport_error)?;
        if text.trim().is_empty() {
            return Err(SyncError::Payload("remote returned empty content".to_string()));
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| SyncError::Payload(e.to_string()))
    }
}

fn transport_error(error: reqwest::Error) -> SyncError {
    SyncError::Transport(error.to_string())
}

fn upload_outcome(result: Result<(), SyncError>) -> SyncOutcome {
    match result {
        Ok(()) => SyncOutcome::ok("upload succeeded"),
        Err(error) => SyncOutcome::failed(format!("upload failed: {error}")),
    }
}

#[async_trait]
impl SyncClient for WebDavClient {
    async fn ensure_folder(&self, config: &SyncConfig) -> Result<(), SyncError> {
        let mkcol = Method::from_bytes(b"MKCOL")
            .map_err(|e| SyncError::Transport(format!("invalid method: {e}")))?;
        let response = self
            .request(mkcol, &config.folder_url(), config)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        // 405: the collection already exists.
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
            Ok(())
        } else {
            Err(SyncError::RemoteStatus(RemoteStatus::from_code(status.as_u16())))
        }
    }

    async fn upload_favorites(
        &self,
        config: &SyncConfig,
        payload: &FavoritesPayload,
    ) -> SyncOutcome {
        upload_outcome(self.put_json(config, FAVORITES_FILE_NAME, payload).await)
    }

    async fn upload_name_plans(
        &self,
        config: &SyncConfig,
        payload: &NamePlansPayload,
    ) -> SyncOutcome {
        upload_outcome(self.put_json(config, NAME_PLANS_FILE_NAME, payload).await)
    }

    async fn download_favorites(
        &self,
        config: &SyncConfig,
    ) -> Result<FavoritesPayload, SyncError> {
        self.get_json(config, FAVORITES_FILE_NAME)
            .await?
            .ok_or(SyncError::RemoteStatus(RemoteStatus::NotFound))
    }

    async fn download_name_plans(
        &self,
        config: &SyncConfig,
    ) -> Result<Option<NamePlansPayload>, SyncError> {
        self.get_json(config, NAME_PLANS_FILE_NAME).await
    }
}
