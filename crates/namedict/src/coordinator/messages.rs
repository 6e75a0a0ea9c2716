//! User-facing sync status text.

use crate::sync::SyncError;

pub const HTTPS_REQUIRED: &str = "Sync server must use HTTPS (https://)";
pub const HTTPS_REQUIRED_ON_SAVE: &str = "Only HTTPS sync servers are supported, use https://";
pub const SYNC_BUSY: &str = "Sync in progress, please try again later";
pub const CONFIG_SAVED: &str = "Sync configuration saved";
pub const UPLOAD_INCOMPLETE: &str = "Sync configuration is incomplete, cannot upload";
pub const DOWNLOAD_INCOMPLETE: &str = "Sync configuration is incomplete, cannot download";
pub const NOT_LOADED: &str = "Dictionary is not loaded yet";

pub fn auto(message: &str) -> String {
    format!("Auto-sync: {message}")
}

pub fn auto_skipped(reason: &str) -> String {
    format!("Auto-sync skipped: {reason}")
}

pub fn folder_failed(error: &SyncError) -> String {
    format!("Failed to prepare sync folder: {error}")
}

pub fn summary(favorites: &str, name_plans: &str) -> String {
    format!("favorites: {favorites} / name plans: {name_plans}")
}

pub fn download_failed(error: &SyncError) -> String {
    format!("Download failed: {error}")
}

pub fn favorites_replaced(count: usize) -> String {
    format!("downloaded, replaced local favorites ({count})")
}

pub const NAME_PLANS_RESTORED: &str = "restored";
pub const NAME_PLANS_MISSING: &str = "remote file not found, nothing to restore";

pub fn name_plans_failed(error: &SyncError) -> String {
    format!("download failed: {error}")
}
