//! Remote sync under the exclusivity gate.
//!
//! Manual requests drop any pending scheduled upload and report a busy gate
//! to the user. Scheduled uploads skip a busy gate silently. The permit is
//! held from config validation to the final status update and released on
//! every exit path when it drops.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::coordinator::gate::SyncPermit;
use crate::coordinator::{messages, Catalog, FavoriteList, Shared, StateCoordinator, SyncTrigger};
use crate::naming::NamingDraft;
use crate::sync::{FavoritesPayload, NamePlansPayload, SyncConfig};
use crate::utils::time::now_millis;

impl StateCoordinator {
    /// Uploads favorites and name plans. `None` when another sync holds the
    /// gate.
    pub fn manual_upload(&self) -> Option<JoinHandle<()>> {
        self.shared.auto_upload.cancel();
        let permit = self.shared.enter_sync(SyncTrigger::Manual)?;
        let shared = self.shared.clone();
        Some(self.shared.spawn(async move {
            shared.upload(permit).await;
        }))
    }

    /// Replaces local favorites (and name plans, when present remotely) with
    /// the remote copy.
    pub fn manual_download(&self) -> Option<JoinHandle<()>> {
        self.shared.auto_upload.cancel();
        let Some(catalog) = self.shared.catalog() else {
            self.shared.post_status(messages::NOT_LOADED);
            return None;
        };
        let permit = self.shared.enter_sync(SyncTrigger::Manual)?;
        let shared = self.shared.clone();
        Some(self.shared.spawn(async move {
            shared.download(permit, catalog).await;
        }))
    }

    pub fn is_sync_running(&self) -> bool {
        self.shared.gate.is_held()
    }
}

impl Shared {
    /// Restarts the quiet period before the next scheduled upload.
    pub(super) fn schedule_auto_upload(self: &Arc<Self>) {
        let shared = self.clone();
        self.auto_upload
            .schedule(self.settings.auto_upload_delay, async move {
                if let Some(permit) = shared.enter_sync(SyncTrigger::Scheduled) {
                    shared.upload(permit).await;
                }
            });
    }

    fn enter_sync(&self, trigger: SyncTrigger) -> Option<SyncPermit> {
        let permit = self.gate.try_enter(trigger, &self.snapshot);
        if permit.is_none() {
            match trigger {
                SyncTrigger::Manual => self.post_status(messages::SYNC_BUSY),
                SyncTrigger::Scheduled => {
                    tracing::debug!("skipping scheduled sync: another sync is running")
                }
            }
        }
        permit
    }

    /// Checks transport security, then completeness. Reports failures in
    /// the caller's phrasing and returns whether the sync may proceed.
    fn validate_config(&self, config: &SyncConfig, trigger: SyncTrigger, incomplete: &str) -> bool {
        if config.check_transport().is_err() {
            let message = match trigger {
                SyncTrigger::Manual => messages::HTTPS_REQUIRED.to_string(),
                SyncTrigger::Scheduled => messages::auto_skipped(messages::HTTPS_REQUIRED),
            };
            self.post_status(message);
            return false;
        }
        if !config.is_complete() {
            match trigger {
                SyncTrigger::Manual => self.post_status(incomplete),
                SyncTrigger::Scheduled => {
                    tracing::debug!("skipping scheduled sync: configuration incomplete")
                }
            }
            return false;
        }
        true
    }

    async fn upload(&self, permit: SyncPermit) {
        let trigger = permit.trigger();
        let (config, order, draft) = {
            let state = self.snapshot.borrow();
            (
                state.sync_config.clone(),
                state.favorite_order.clone(),
                state.naming.clone(),
            )
        };
        if !self.validate_config(&config, trigger, messages::UPLOAD_INCOMPLETE) {
            return;
        }

        tracing::info!("starting {trigger:?} upload of {} favorites", order.len());
        let client = &self.deps.sync_client;
        let message = match client.ensure_folder(&config).await {
            Err(error) => messages::folder_failed(&error),
            Ok(()) => {
                let now = now_millis();
                let favorites = client
                    .upload_favorites(&config, &FavoritesPayload::new(now, order))
                    .await;
                let name_plans = client
                    .upload_name_plans(
                        &config,
                        &NamePlansPayload::new(now, draft.surname, draft.schemes),
                    )
                    .await;
                messages::summary(&favorites.message, &name_plans.message)
            }
        };
        let message = match trigger {
            SyncTrigger::Manual => message,
            SyncTrigger::Scheduled => messages::auto(&message),
        };
        tracing::info!("upload finished: {message}");
        self.post_status(message);
    }

    async fn download(self: Arc<Self>, _permit: SyncPermit, catalog: Arc<Catalog>) {
        let config = self.snapshot.borrow().sync_config.clone();
        if !self.validate_config(&config, SyncTrigger::Manual, messages::DOWNLOAD_INCOMPLETE) {
            return;
        }

        tracing::info!("starting manual download");
        let client = &self.deps.sync_client;
        let payload = match client.download_favorites(&config).await {
            Ok(payload) => payload,
            Err(error) => {
                tracing::info!("download failed: {error}");
                self.post_status(messages::download_failed(&error));
                return;
            }
        };
        let name_plans = client.download_name_plans(&config).await;

        let count = {
            let mut state = self.state.lock();
            state.favorites = FavoriteList::sanitized(&payload.favorite_order, |id| {
                catalog.dictionary().contains(id)
            });
            self.publish_favorites(&catalog, &state.favorites);
            state.favorites.len()
        };
        self.persist_favorites();

        let name_plans_message = match name_plans {
            Ok(Some(plans)) => {
                self.snapshot.send_modify(|state| {
                    state.naming = NamingDraft {
                        surname: plans.surname,
                        schemes: plans.schemes,
                        active_scheme_id: state.naming.active_scheme_id,
                        active_slot_index: state.naming.active_slot_index,
                    }
                    .sanitized();
                });
                self.persist_naming();
                messages::NAME_PLANS_RESTORED.to_string()
            }
            Ok(None) => messages::NAME_PLANS_MISSING.to_string(),
            Err(error) => messages::name_plans_failed(&error),
        };

        let message = messages::summary(&messages::favorites_replaced(count), &name_plans_message);
        tracing::info!("download finished: {message}");
        self.post_status(message);
    }
}
