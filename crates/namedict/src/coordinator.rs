//! The state coordinator: owns the observable [`DictSnapshot`] and
//! sequences every mutation of it.
//!
//! Filter recomputation runs through a [`FilterCalculator`] with latest-wins
//! cancellation. Persistence is best effort and never blocks the in-memory
//! update that triggered it; [`StateCoordinator::flush`] waits for the
//! writes still in flight. Remote sync is guarded by a try-lock gate, see
//! [`sync`](self::sync).

pub mod calculator;
mod debounce;
pub mod favorites;
mod gate;
pub mod messages;
mod naming;
pub mod snapshot;
mod sync;
#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dictionary::{CancellationToken, IndexCategory, RecordId, Selection, VersionTracker};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::config::{DEFAULT_AUTO_UPLOAD_DELAY_MS, DEFAULT_SCROLL_DEBOUNCE_MS};
use crate::error::{CoreError, CoreResult};
use crate::loader::DictionaryLoader;
use crate::prefs::{PrefsSnapshot, ScrollAnchor, ScrollList, SharedPersistence};
use crate::sync::{SyncClient, SyncConfig, SyncError};

pub use calculator::{BlockingFilterCalculator, Catalog, FilterCalculator, FilteredSet};
pub use favorites::FavoriteList;
pub use snapshot::{DictSnapshot, LoadState, RecomputeState, SyncState, SyncTrigger};

use self::debounce::Debouncer;
use self::gate::SyncGate;

/// Timing knobs for deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Quiet period after the last favorite or draft edit before uploading.
    pub auto_upload_delay: Duration,
    /// Quiet period after the last scroll event before persisting it.
    pub scroll_debounce: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            auto_upload_delay: Duration::from_millis(DEFAULT_AUTO_UPLOAD_DELAY_MS),
            scroll_debounce: Duration::from_millis(DEFAULT_SCROLL_DEBOUNCE_MS),
        }
    }
}

/// Collaborators the coordinator drives.
#[derive(Clone)]
pub struct CoordinatorDeps {
    pub loader: Arc<dyn DictionaryLoader>,
    pub prefs: SharedPersistence,
    pub sync_client: Arc<dyn SyncClient>,
    pub calculator: Arc<dyn FilterCalculator>,
}

#[derive(Clone)]
pub struct StateCoordinator {
    shared: Arc<Shared>,
}

struct Shared {
    runtime: Handle,
    settings: CoordinatorSettings,
    deps: CoordinatorDeps,
    snapshot: Arc<watch::Sender<DictSnapshot>>,
    state: Mutex<CoreState>,
    recomputes: VersionTracker,
    loads: VersionTracker,
    /// Serializes filter-state writes so an older result never lands last.
    filter_writes: tokio::sync::Mutex<()>,
    favorite_writes: tokio::sync::Mutex<()>,
    naming_writes: tokio::sync::Mutex<()>,
    gate: SyncGate,
    /// Background writes and sync tasks, awaited by `flush`.
    tasks: TaskTracker,
    auto_upload: Debouncer,
    main_scroll: Debouncer,
    favorites_scroll: Debouncer,
}

/// Mutable state that is not itself observable.
#[derive(Default)]
struct CoreState {
    catalog: Option<Arc<Catalog>>,
    /// Most recently issued selection; toggles build on it rather than on
    /// the applied one so rapid edits are not lost.
    issued_selection: Selection,
    favorites: FavoriteList,
}

impl StateCoordinator {
    /// Creates a coordinator bound to the current tokio runtime. Call
    /// [`load`](Self::load) to populate it.
    pub fn new(deps: CoordinatorDeps, settings: CoordinatorSettings) -> CoreResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|error| CoreError::Internal(format!("no tokio runtime: {error}")))?;
        let (snapshot, _) = watch::channel(DictSnapshot::default());
        let tasks = TaskTracker::new();
        let shared = Shared {
            settings,
            deps,
            snapshot: Arc::new(snapshot),
            state: Mutex::new(CoreState::default()),
            recomputes: VersionTracker::new(),
            loads: VersionTracker::new(),
            filter_writes: tokio::sync::Mutex::new(()),
            favorite_writes: tokio::sync::Mutex::new(()),
            naming_writes: tokio::sync::Mutex::new(()),
            gate: SyncGate::default(),
            auto_upload: Debouncer::new(runtime.clone()),
            main_scroll: Debouncer::new(runtime.clone()).tracked_by(tasks.clone()),
            favorites_scroll: Debouncer::new(runtime.clone()).tracked_by(tasks.clone()),
            tasks,
            runtime,
        };
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<DictSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> DictSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Sorted values of `category` in the loaded index.
    pub fn category_values(&self, category: IndexCategory) -> Vec<String> {
        match self.shared.catalog() {
            Some(catalog) => catalog
                .dictionary()
                .index()
                .values(category)
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Loads the dictionary and restores persisted state. A failure leaves
    /// the snapshot in [`LoadState::Failed`]; call [`reload`](Self::reload)
    /// to retry.
    pub async fn load(&self) {
        self.shared.clone().load().await;
    }

    pub fn reload(&self) -> JoinHandle<()> {
        let shared = self.shared.clone();
        self.shared.spawn(async move { shared.load().await })
    }

    /// Waits for every write, recomputation, and manual sync started so far,
    /// including debounced scroll writes. A scheduled upload still in its
    /// quiet period is not waited for.
    pub async fn flush(&self) {
        let tasks = &self.shared.tasks;
        tasks.close();
        tasks.wait().await;
        tasks.reopen();
    }

    pub fn toggle_value(&self, category: IndexCategory, value: &str) -> Option<JoinHandle<()>> {
        self.shared
            .issue_selection(|issued| issued.toggled(category, value))
    }

    pub fn clear_category(&self, category: IndexCategory) -> Option<JoinHandle<()>> {
        self.shared
            .issue_selection(|issued| issued.without_category(category))
    }

    pub fn clear_all(&self) -> Option<JoinHandle<()>> {
        self.shared.issue_selection(|_| Selection::new())
    }

    /// Moves the category focus. The selection and scroll state are kept.
    pub fn select_category(&self, category: IndexCategory) {
        let mut selection = None;
        self.shared.snapshot.send_if_modified(|state| {
            if state.selected_category == category {
                return false;
            }
            state.selected_category = category;
            selection = Some(state.selection.clone());
            true
        });
        let Some(selection) = selection else {
            return;
        };
        let shared = self.shared.clone();
        self.shared.spawn(async move {
            let _writes = shared.filter_writes.lock().await;
            if let Err(error) = shared
                .deps
                .prefs
                .write_filter_state(category.key(), &selection.to_keyed())
                .await
            {
                tracing::warn!("failed to persist filter state: {error}");
            }
        });
    }

    /// Adds or removes a favorite and re-arms the deferred upload.
    pub fn toggle_favorite(&self, id: RecordId) {
        let Some(catalog) = self.shared.catalog() else {
            tracing::debug!("ignoring favorite toggle before load");
            return;
        };
        if !catalog.dictionary().contains(id) {
            tracing::debug!("ignoring favorite toggle for unknown id {id}");
            return;
        }
        {
            let mut state = self.shared.state.lock();
            state.favorites.toggle(id);
            self.shared.publish_favorites(&catalog, &state.favorites);
        }
        self.shared.persist_favorites();
        self.shared.schedule_auto_upload();
    }

    pub fn set_favorites_only(&self, enabled: bool) {
        let changed = self.shared.snapshot.send_if_modified(|state| {
            if state.favorites_only == enabled {
                return false;
            }
            state.favorites_only = enabled;
            true
        });
        if changed {
            self.shared
                .persist("favorites-only flag", move |prefs| async move {
                    prefs.write_favorites_only(enabled).await
                });
        }
    }

    pub fn select_entry(&self, id: RecordId) {
        self.shared
            .snapshot
            .send_modify(|state| state.selected_entry = Some(id));
    }

    pub fn back_to_list(&self) {
        self.shared.snapshot.send_if_modified(|state| {
            state.selected_entry.take().is_some()
        });
    }

    pub fn record_main_scroll(&self, anchor_id: Option<RecordId>, offset_px: i64) {
        self.shared
            .record_scroll(ScrollList::Main, ScrollAnchor::new(anchor_id, offset_px));
    }

    pub fn record_favorites_scroll(&self, anchor_id: Option<RecordId>, offset_px: i64) {
        self.shared
            .record_scroll(ScrollList::Favorites, ScrollAnchor::new(anchor_id, offset_px));
    }

    /// Validates and stores new sync settings. Endpoint and user name are
    /// trimmed; a non-HTTPS endpoint is refused and nothing changes.
    pub fn update_sync_config(
        &self,
        server_url: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SyncError> {
        let config = SyncConfig::new(server_url.trim(), username.trim(), password);
        if let Err(error) = config.check_transport() {
            self.shared.post_status(messages::HTTPS_REQUIRED_ON_SAVE);
            return Err(error);
        }
        let stored = config.clone();
        self.shared.snapshot.send_modify(|state| {
            state.sync_config = config;
            state.last_sync_message = Some(messages::CONFIG_SAVED.to_string());
        });
        self.shared.persist("sync configuration", move |prefs| async move {
            prefs.write_sync_config(&stored).await
        });
        Ok(())
    }
}

impl Shared {
    fn catalog(&self) -> Option<Arc<Catalog>> {
        self.state.lock().catalog.clone()
    }

    fn post_status(&self, message: impl Into<String>) {
        let message = message.into();
        self.snapshot
            .send_modify(|state| state.last_sync_message = Some(message));
    }

    fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn_on(task, &self.runtime)
    }

    /// Runs a best-effort write in the background; failures are logged.
    fn persist<F, Fut>(&self, what: &'static str, write: F)
    where
        F: FnOnce(SharedPersistence) -> Fut + Send + 'static,
        Fut: Future<Output = CoreResult<()>> + Send + 'static,
    {
        let prefs = self.deps.prefs.clone();
        self.spawn(async move {
            if let Err(error) = write(prefs).await {
                tracing::warn!("failed to persist {what}: {error}");
            }
        });
    }

    async fn load(self: Arc<Self>) {
        let load_token = self.loads.issue();
        self.snapshot.send_modify(|state| state.load_state = LoadState::Loading);

        let dictionary = match self.deps.loader.load_all().await {
            Ok(dictionary) => dictionary,
            Err(error) => {
                tracing::warn!("failed to load dictionary: {error}");
                if !load_token.is_cancelled() {
                    self.snapshot
                        .send_modify(|state| state.load_state = LoadState::Failed(error.to_string()));
                }
                return;
            }
        };
        let prefs = self.deps.prefs.read_snapshot().await;
        let catalog = Arc::new(Catalog::new(dictionary));

        let selection = Selection::from_keyed(&prefs.selected_values, catalog.dictionary().index());
        let favorites = FavoriteList::sanitized(&prefs.favorite_order, |id| {
            catalog.dictionary().contains(id)
        });
        let (selection, filtered) = match self
            .deps
            .calculator
            .compute(catalog.clone(), selection.clone(), CancellationToken::noop())
            .await
        {
            Some(filtered) => (selection, filtered),
            None => {
                tracing::warn!("initial filter failed; starting unfiltered");
                (Selection::new(), catalog.everything().clone())
            }
        };
        if load_token.is_cancelled() {
            tracing::debug!("discarding superseded dictionary load");
            return;
        }

        let version = {
            let mut state = self.state.lock();
            state.catalog = Some(catalog.clone());
            state.favorites = favorites.clone();
            state.issued_selection = selection.clone();
            // Anything still computing against the previous catalog is stale.
            self.recomputes.next_version()
        };
        let PrefsSnapshot {
            selected_category_key,
            main_scroll,
            favorites_scroll,
            favorites_only,
            sync_config,
            naming,
            ..
        } = prefs;
        let selected_category = selected_category_key
            .as_deref()
            .and_then(IndexCategory::from_key)
            .unwrap_or_default();
        let favorite_entries = catalog.dictionary().entries_for(favorites.order());
        self.snapshot.send_modify(|state| {
            *state = DictSnapshot {
                load_state: LoadState::Ready,
                selected_category,
                selection,
                filtered,
                recompute: RecomputeState::Applied(version),
                favorite_order: favorites.order().to_vec(),
                favorite_ids: favorites.ids(),
                favorite_entries,
                favorites_only,
                selected_entry: None,
                main_scroll,
                favorites_scroll,
                sync_config,
                sync_state: state.sync_state,
                last_sync_message: state.last_sync_message.take(),
                naming,
            };
        });
        tracing::info!("dictionary ready with {} entries", catalog.dictionary().len());
    }

    /// Derives the next selection from the issued one and starts its
    /// recomputation. `None` when nothing changed or nothing is loaded.
    fn issue_selection<F>(self: &Arc<Self>, derive: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(&Selection) -> Selection,
    {
        let (catalog, selection, token) = {
            let mut state = self.state.lock();
            let catalog = state.catalog.clone()?;
            let next = derive(&state.issued_selection);
            if next == state.issued_selection {
                return None;
            }
            state.issued_selection = next.clone();
            (catalog, next, self.recomputes.issue())
        };
        let version = token.version();
        self.snapshot.send_if_modified(|state| {
            // A concurrent issue may already have moved past this version.
            if token.is_cancelled() {
                return false;
            }
            state.recompute = RecomputeState::Computing(version);
            true
        });

        let shared = self.clone();
        Some(self.spawn(async move {
            shared.recompute(catalog, selection, token).await;
        }))
    }

    async fn recompute(
        self: Arc<Self>,
        catalog: Arc<Catalog>,
        selection: Selection,
        token: CancellationToken,
    ) {
        let version = token.version();
        let Some(filtered) = self
            .deps
            .calculator
            .compute(catalog, selection.clone(), token.clone())
            .await
        else {
            tracing::debug!("recomputation {version} cancelled");
            return;
        };

        let mut selection_changed = false;
        let mut category = IndexCategory::default();
        let applied = self.snapshot.send_if_modified(|state| {
            if token.is_cancelled() {
                return false;
            }
            selection_changed = state.selection != selection;
            state.selection = selection.clone();
            state.filtered = filtered;
            state.recompute = RecomputeState::Applied(version);
            if selection_changed {
                state.main_scroll = ScrollAnchor::default();
                // Replaces any pending scroll write while the snapshot is
                // still locked, so a later scroll is ordered after the reset.
                self.schedule_scroll_write(
                    ScrollList::Main,
                    ScrollAnchor::default(),
                    Duration::ZERO,
                );
            }
            category = state.selected_category;
            true
        });
        if !applied {
            tracing::debug!("discarding stale recomputation {version}");
            return;
        }

        let _writes = self.filter_writes.lock().await;
        if token.is_cancelled() {
            return;
        }
        if let Err(error) = self
            .deps
            .prefs
            .write_filter_state(category.key(), &selection.to_keyed())
            .await
        {
            tracing::warn!("failed to persist filter state: {error}");
        }
    }

    /// Writes the current favorite order. Each write reads the order once it
    /// holds the write lock, so the stored order converges on the latest.
    fn persist_favorites(self: &Arc<Self>) {
        let shared = self.clone();
        self.spawn(async move {
            let _writes = shared.favorite_writes.lock().await;
            let order = shared.state.lock().favorites.order().to_vec();
            if let Err(error) = shared.deps.prefs.write_favorite_order(&order).await {
                tracing::warn!("failed to persist favorite order: {error}");
            }
        });
    }

    fn persist_naming(self: &Arc<Self>) {
        let shared = self.clone();
        self.spawn(async move {
            let _writes = shared.naming_writes.lock().await;
            let draft = shared.snapshot.borrow().naming.clone();
            if let Err(error) = shared.deps.prefs.write_naming_draft(&draft).await {
                tracing::warn!("failed to persist naming draft: {error}");
            }
        });
    }

    fn publish_favorites(&self, catalog: &Catalog, favorites: &FavoriteList) {
        let entries = catalog.dictionary().entries_for(favorites.order());
        self.snapshot.send_modify(|state| {
            state.favorite_order = favorites.order().to_vec();
            state.favorite_ids = favorites.ids();
            state.favorite_entries = entries;
        });
    }

    fn record_scroll(&self, list: ScrollList, anchor: ScrollAnchor) {
        self.snapshot.send_if_modified(|state| {
            let slot = match list {
                ScrollList::Main => &mut state.main_scroll,
                ScrollList::Favorites => &mut state.favorites_scroll,
            };
            if *slot == anchor {
                return false;
            }
            *slot = anchor;
            self.schedule_scroll_write(list, anchor, self.settings.scroll_debounce);
            true
        });
    }

    /// Callers hold the snapshot lock, which keeps the stored anchor in step
    /// with the published one.
    fn schedule_scroll_write(&self, list: ScrollList, anchor: ScrollAnchor, delay: Duration) {
        let debouncer = match list {
            ScrollList::Main => &self.main_scroll,
            ScrollList::Favorites => &self.favorites_scroll,
        };
        let prefs = self.deps.prefs.clone();
        debouncer.schedule(delay, async move {
            if let Err(error) = prefs.write_scroll_anchor(list, anchor).await {
                tracing::warn!("failed to persist scroll position: {error}");
            }
        });
    }
}
