use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dictionary::{CancellationToken, Dictionary, IndexCategory, RecordId, Selection};
use parking_lot::Mutex;

use super::*;
use crate::loader::DictionaryLoader;
use crate::naming::{GivenNameMode, NamingDraft, NamingScheme};
use crate::prefs::{PersistenceStore, PrefsSnapshot, ScrollAnchor, ScrollList, StoragePrefs};
use crate::secure::MemorySecureStore;
use crate::storage::FileStorage;
use crate::sync::{
    FavoritesPayload, NamePlansPayload, RemoteStatus, SyncClient, SyncConfig, SyncError,
    SyncOutcome,
};

const ENTRIES: &str = r#"[
    { "id": 1, "char": "一", "structure": { "radical": "A" }, "phonetics": { "tones": [1] } },
    { "id": 2, "char": "二", "structure": { "radical": "A" }, "phonetics": { "tones": [2] } },
    { "id": 3, "char": "三", "structure": { "radical": "B" }, "phonetics": { "tones": [1] } },
    { "id": 4, "char": "四", "structure": { "radical": "C" }, "phonetics": { "tones": [2] } },
    { "id": 5, "char": "五", "structure": { "radical": "C" }, "phonetics": { "tones": [1] } }
]"#;

const INDEX: &str = r#"{
    "structure.radical": { "A": [1, 2], "B": [3], "C": [4, 5] },
    "phonetics.tones": { "1": [1, 3, 5], "2": [2, 4] }
}"#;

const SECURE_URL: &str = "https://dav.example.com/";

fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        auto_upload_delay: Duration::from_millis(1_000),
        scroll_debounce: Duration::from_millis(300),
    }
}

fn secure_config() -> SyncConfig {
    SyncConfig::new(SECURE_URL, "me", "secret")
}

fn ids(set: &FilteredSet) -> Vec<RecordId> {
    set.ids.iter().copied().collect()
}

fn selection(category: IndexCategory, values: &[&str]) -> Selection {
    let mut selection = Selection::new();
    selection.set_values(category, values.iter().copied());
    selection
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

struct FakeLoader {
    fail: AtomicBool,
}

#[async_trait]
impl DictionaryLoader for FakeLoader {
    async fn load_all(&self) -> CoreResult<Arc<Dictionary>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Load("bundle missing".to_string()));
        }
        Ok(Arc::new(Dictionary::from_json(
            ENTRIES.as_bytes(),
            INDEX.as_bytes(),
        )?))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Write {
    Favorites(Vec<RecordId>),
    Filter(String, BTreeMap<String, Vec<String>>),
    Scroll(ScrollList, ScrollAnchor),
    FavoritesOnly(bool),
    Sync(SyncConfig),
    Naming(NamingDraft),
}

#[derive(Default)]
struct RecordingPrefs {
    initial: PrefsSnapshot,
    writes: Mutex<Vec<Write>>,
    fail: AtomicBool,
}

impl RecordingPrefs {
    fn record(&self, write: Write) -> CoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("disk full".to_string()));
        }
        self.writes.lock().push(write);
        Ok(())
    }

    fn writes(&self) -> Vec<Write> {
        self.writes.lock().clone()
    }

    fn scroll_writes(&self, list: ScrollList) -> Vec<ScrollAnchor> {
        self.writes()
            .into_iter()
            .filter_map(|write| match write {
                Write::Scroll(written, anchor) if written == list => Some(anchor),
                _ => None,
            })
            .collect()
    }

    fn filter_writes(&self) -> Vec<(String, BTreeMap<String, Vec<String>>)> {
        self.writes()
            .into_iter()
            .filter_map(|write| match write {
                Write::Filter(key, values) => Some((key, values)),
                _ => None,
            })
            .collect()
    }

    fn favorite_writes(&self) -> Vec<Vec<RecordId>> {
        self.writes()
            .into_iter()
            .filter_map(|write| match write {
                Write::Favorites(order) => Some(order),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PersistenceStore for RecordingPrefs {
    async fn read_snapshot(&self) -> PrefsSnapshot {
        self.initial.clone()
    }

    async fn write_favorite_order(&self, order: &[RecordId]) -> CoreResult<()> {
        self.record(Write::Favorites(order.to_vec()))
    }

    async fn write_filter_state(
        &self,
        category_key: &str,
        selected_values: &BTreeMap<String, Vec<String>>,
    ) -> CoreResult<()> {
        self.record(Write::Filter(
            category_key.to_string(),
            selected_values.clone(),
        ))
    }

    async fn write_scroll_anchor(&self, list: ScrollList, anchor: ScrollAnchor) -> CoreResult<()> {
        self.record(Write::Scroll(list, anchor))
    }

    async fn write_favorites_only(&self, enabled: bool) -> CoreResult<()> {
        self.record(Write::FavoritesOnly(enabled))
    }

    async fn write_sync_config(&self, config: &SyncConfig) -> CoreResult<()> {
        self.record(Write::Sync(config.clone()))
    }

    async fn write_naming_draft(&self, draft: &NamingDraft) -> CoreResult<()> {
        self.record(Write::Naming(draft.clone()))
    }
}

struct FakeSyncClient {
    calls: Mutex<Vec<&'static str>>,
    delay: Mutex<Duration>,
    folder_error: Mutex<Option<SyncError>>,
    uploaded_favorites: Mutex<Vec<FavoritesPayload>>,
    uploaded_plans: Mutex<Vec<NamePlansPayload>>,
    remote_favorites: Mutex<Result<FavoritesPayload, SyncError>>,
    remote_plans: Mutex<Result<Option<NamePlansPayload>, SyncError>>,
}

impl FakeSyncClient {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            folder_error: Mutex::new(None),
            uploaded_favorites: Mutex::new(Vec::new()),
            uploaded_plans: Mutex::new(Vec::new()),
            remote_favorites: Mutex::new(Err(SyncError::RemoteStatus(RemoteStatus::NotFound))),
            remote_plans: Mutex::new(Ok(None)),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    async fn enter(&self, call: &'static str) {
        self.calls.lock().push(call);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SyncClient for FakeSyncClient {
    async fn ensure_folder(&self, _config: &SyncConfig) -> Result<(), SyncError> {
        self.enter("ensure_folder").await;
        match self.folder_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn upload_favorites(
        &self,
        _config: &SyncConfig,
        payload: &FavoritesPayload,
    ) -> SyncOutcome {
        self.enter("upload_favorites").await;
        self.uploaded_favorites.lock().push(payload.clone());
        SyncOutcome::ok("upload succeeded")
    }

    async fn upload_name_plans(
        &self,
        _config: &SyncConfig,
        payload: &NamePlansPayload,
    ) -> SyncOutcome {
        self.enter("upload_name_plans").await;
        self.uploaded_plans.lock().push(payload.clone());
        SyncOutcome::ok("upload succeeded")
    }

    async fn download_favorites(
        &self,
        _config: &SyncConfig,
    ) -> Result<FavoritesPayload, SyncError> {
        self.enter("download_favorites").await;
        self.remote_favorites.lock().clone()
    }

    async fn download_name_plans(
        &self,
        _config: &SyncConfig,
    ) -> Result<Option<NamePlansPayload>, SyncError> {
        self.enter("download_name_plans").await;
        self.remote_plans.lock().clone()
    }
}

/// Sleeps per selection before filtering, to stage out-of-order completion.
#[derive(Default)]
struct DelayedCalculator {
    delays: Mutex<Vec<(Selection, Duration)>>,
    ignore_cancellation: bool,
}

impl DelayedCalculator {
    fn delay(&self, selection: Selection, delay: Duration) {
        self.delays.lock().push((selection, delay));
    }
}

#[async_trait]
impl FilterCalculator for DelayedCalculator {
    async fn compute(
        &self,
        catalog: Arc<Catalog>,
        selection: Selection,
        token: CancellationToken,
    ) -> Option<FilteredSet> {
        let delay = self
            .delays
            .lock()
            .iter()
            .find(|(staged, _)| *staged == selection)
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.ignore_cancellation {
            catalog.filter(&selection, &CancellationToken::noop())
        } else {
            catalog.filter(&selection, &token)
        }
    }
}

struct Harness {
    coordinator: StateCoordinator,
    prefs: Arc<RecordingPrefs>,
    client: Arc<FakeSyncClient>,
}

impl Harness {
    fn status(&self) -> Option<String> {
        self.coordinator.snapshot().last_sync_message
    }
}

async fn harness_with(initial: PrefsSnapshot, calculator: DelayedCalculator) -> Harness {
    let loader = Arc::new(FakeLoader {
        fail: AtomicBool::new(false),
    });
    let prefs = Arc::new(RecordingPrefs {
        initial,
        ..RecordingPrefs::default()
    });
    let client = Arc::new(FakeSyncClient::new());
    let coordinator = StateCoordinator::new(
        CoordinatorDeps {
            loader,
            prefs: prefs.clone(),
            sync_client: client.clone(),
            calculator: Arc::new(calculator),
        },
        settings(),
    )
    .expect("coordinator");
    coordinator.load().await;
    Harness {
        coordinator,
        prefs,
        client,
    }
}

async fn harness() -> Harness {
    harness_with(
        PrefsSnapshot {
            sync_config: secure_config(),
            ..PrefsSnapshot::default()
        },
        DelayedCalculator::default(),
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn load_restores_sanitized_state() {
    let initial = PrefsSnapshot {
        favorite_order: vec![3, 42, 1, 3],
        selected_category_key: Some("phonetics.tones".to_string()),
        selected_values: [
            (
                "structure.radical".to_string(),
                vec!["A".to_string(), "Z".to_string()],
            ),
            ("bogus".to_string(), vec!["A".to_string()]),
        ]
        .into_iter()
        .collect(),
        main_scroll: ScrollAnchor::new(Some(2), 80),
        ..PrefsSnapshot::default()
    };
    let h = harness_with(initial, DelayedCalculator::default()).await;
    let snapshot = h.coordinator.snapshot();

    assert_eq!(snapshot.load_state, LoadState::Ready);
    assert_eq!(snapshot.selected_category, IndexCategory::PhoneticsTones);
    assert_eq!(
        snapshot.selection,
        selection(IndexCategory::StructureRadical, &["A"])
    );
    assert_eq!(ids(&snapshot.filtered), vec![1, 2]);
    assert!(matches!(snapshot.recompute, RecomputeState::Applied(_)));
    assert_eq!(snapshot.favorite_order, vec![3, 1]);
    assert_eq!(snapshot.favorite_entries.len(), 2);
    assert_eq!(snapshot.main_scroll, ScrollAnchor::new(Some(2), 80));
    assert!(h.prefs.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_load_can_be_retried() {
    let loader = Arc::new(FakeLoader {
        fail: AtomicBool::new(true),
    });
    let coordinator = StateCoordinator::new(
        CoordinatorDeps {
            loader: loader.clone(),
            prefs: Arc::new(RecordingPrefs::default()),
            sync_client: Arc::new(FakeSyncClient::new()),
            calculator: Arc::new(DelayedCalculator::default()),
        },
        settings(),
    )
    .unwrap();

    coordinator.load().await;
    assert!(matches!(
        coordinator.snapshot().load_state,
        LoadState::Failed(_)
    ));
    assert!(coordinator
        .toggle_value(IndexCategory::StructureRadical, "A")
        .is_none());

    loader.fail.store(false, Ordering::SeqCst);
    coordinator.reload().await.unwrap();
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.load_state, LoadState::Ready);
    assert_eq!(snapshot.filtered.len(), 5);
    assert_eq!(
        coordinator.category_values(IndexCategory::PhoneticsTones),
        vec!["1", "2"]
    );
}

#[tokio::test(start_paused = true)]
async fn filter_intersects_selected_categories() {
    let h = harness().await;
    h.coordinator
        .toggle_value(IndexCategory::StructureRadical, "A")
        .unwrap()
        .await
        .unwrap();
    h.coordinator
        .toggle_value(IndexCategory::PhoneticsTones, "1")
        .unwrap()
        .await
        .unwrap();

    let snapshot = h.coordinator.snapshot();
    assert_eq!(ids(&snapshot.filtered), vec![1]);
    assert_eq!(snapshot.filtered.entries[0].char, "一");

    let (key, values) = h.prefs.filter_writes().pop().unwrap();
    assert_eq!(key, "structure.radical");
    assert_eq!(values["phonetics.tones"], vec!["1"]);
}

#[tokio::test(start_paused = true)]
async fn latest_issued_selection_wins_over_slower_older_one() {
    let calculator = DelayedCalculator::default();
    calculator.delay(
        selection(IndexCategory::StructureRadical, &["A"]),
        Duration::from_millis(500),
    );
    calculator.delay(
        selection(IndexCategory::StructureRadical, &["A", "B"]),
        Duration::from_millis(10),
    );
    let h = harness_with(PrefsSnapshot::default(), calculator).await;

    let slow = h
        .coordinator
        .toggle_value(IndexCategory::StructureRadical, "A")
        .unwrap();
    let fast = h
        .coordinator
        .toggle_value(IndexCategory::StructureRadical, "B")
        .unwrap();
    assert!(matches!(
        h.coordinator.snapshot().recompute,
        RecomputeState::Computing(_)
    ));

    fast.await.unwrap();
    let after_fast = h.coordinator.snapshot();
    slow.await.unwrap();
    let final_snapshot = h.coordinator.snapshot();

    assert_eq!(ids(&after_fast.filtered), vec![1, 2, 3]);
    assert_eq!(ids(&final_snapshot.filtered), vec![1, 2, 3]);
    assert_eq!(final_snapshot.recompute, after_fast.recompute);
    assert_eq!(
        final_snapshot.selection,
        selection(IndexCategory::StructureRadical, &["A", "B"])
    );
    assert_eq!(h.prefs.filter_writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_result_is_discarded_even_when_computation_ignores_cancel() {
    let calculator = DelayedCalculator {
        ignore_cancellation: true,
        ..DelayedCalculator::default()
    };
    calculator.delay(
        selection(IndexCategory::PhoneticsTones, &["2"]),
        Duration::from_millis(300),
    );
    let h = harness_with(PrefsSnapshot::default(), calculator).await;

    let slow = h
        .coordinator
        .toggle_value(IndexCategory::PhoneticsTones, "2")
        .unwrap();
    let fast = h.coordinator.clear_all().unwrap();
    fast.await.unwrap();
    slow.await.unwrap();

    let snapshot = h.coordinator.snapshot();
    assert!(snapshot.selection.is_empty());
    assert_eq!(snapshot.filtered.len(), 5);
    assert_eq!(h.prefs.filter_writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn toggling_a_value_twice_restores_full_list() {
    let h = harness().await;
    h.coordinator
        .toggle_value(IndexCategory::StructureRadical, "C")
        .unwrap()
        .await
        .unwrap();
    assert_eq!(ids(&h.coordinator.snapshot().filtered), vec![4, 5]);

    h.coordinator
        .toggle_value(IndexCategory::StructureRadical, "C")
        .unwrap()
        .await
        .unwrap();
    let snapshot = h.coordinator.snapshot();
    assert!(snapshot.selection.is_empty());
    assert_eq!(ids(&snapshot.filtered), vec![1, 2, 3, 4, 5]);
    assert!(h.coordinator.clear_all().is_none());
}

#[tokio::test(start_paused = true)]
async fn absent_value_yields_empty_result() {
    let h = harness().await;
    h.coordinator
        .toggle_value(IndexCategory::StructureRadical, "Z")
        .unwrap()
        .await
        .unwrap();
    assert!(h.coordinator.snapshot().filtered.is_empty());

    h.coordinator
        .clear_category(IndexCategory::StructureRadical)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(h.coordinator.snapshot().filtered.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn filter_change_resets_only_main_scroll() {
    let h = harness().await;
    h.coordinator.record_main_scroll(Some(3), 120);
    h.coordinator.record_favorites_scroll(Some(2), 40);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        h.prefs.scroll_writes(ScrollList::Main),
        vec![ScrollAnchor::new(Some(3), 120)]
    );

    h.coordinator
        .toggle_value(IndexCategory::PhoneticsTones, "1")
        .unwrap()
        .await
        .unwrap();
    settle().await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.main_scroll, ScrollAnchor::default());
    assert_eq!(snapshot.favorites_scroll, ScrollAnchor::new(Some(2), 40));
    assert_eq!(
        h.prefs.scroll_writes(ScrollList::Main).last(),
        Some(&ScrollAnchor::default())
    );
    assert_eq!(
        h.prefs.scroll_writes(ScrollList::Favorites),
        vec![ScrollAnchor::new(Some(2), 40)]
    );
}

#[tokio::test(start_paused = true)]
async fn filter_change_drops_pending_main_scroll_write() {
    let h = harness().await;
    h.coordinator.record_main_scroll(Some(4), 500);
    h.coordinator
        .toggle_value(IndexCategory::StructureRadical, "B")
        .unwrap()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        h.prefs.scroll_writes(ScrollList::Main),
        vec![ScrollAnchor::default()]
    );
}

#[tokio::test(start_paused = true)]
async fn main_scroll_recorded_after_filter_change_is_kept() {
    let h = harness().await;
    h.coordinator
        .toggle_value(IndexCategory::StructureRadical, "A")
        .unwrap()
        .await
        .unwrap();
    h.coordinator.record_main_scroll(Some(2), 30);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        h.prefs.scroll_writes(ScrollList::Main).last(),
        Some(&ScrollAnchor::new(Some(2), 30))
    );
    assert_eq!(h.coordinator.snapshot().main_scroll, ScrollAnchor::new(Some(2), 30));
}

#[tokio::test(start_paused = true)]
async fn select_category_moves_focus_without_recomputing() {
    let h = harness().await;
    h.coordinator.record_main_scroll(Some(5), 10);
    let before = h.coordinator.snapshot();

    h.coordinator.select_category(IndexCategory::PhoneticsTones);
    h.coordinator.select_category(IndexCategory::PhoneticsTones);
    settle().await;

    let after = h.coordinator.snapshot();
    assert_eq!(after.selected_category, IndexCategory::PhoneticsTones);
    assert_eq!(after.recompute, before.recompute);
    assert_eq!(after.main_scroll, ScrollAnchor::new(Some(5), 10));
    assert_eq!(
        h.prefs.filter_writes(),
        vec![("phonetics.tones".to_string(), BTreeMap::new())]
    );
}

#[tokio::test(start_paused = true)]
async fn scroll_burst_persists_once_with_last_values() {
    let h = harness().await;
    for step in 0..10 {
        h.coordinator.record_main_scroll(Some(step + 1), i64::from(step) * 25);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    h.coordinator.record_main_scroll(Some(10), -7);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        h.prefs.scroll_writes(ScrollList::Main),
        vec![ScrollAnchor::new(Some(10), 0)]
    );
    assert!(h.prefs.scroll_writes(ScrollList::Favorites).is_empty());
}

#[tokio::test(start_paused = true)]
async fn unchanged_scroll_position_is_ignored() {
    let h = harness().await;
    h.coordinator.record_favorites_scroll(None, 0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.prefs.scroll_writes(ScrollList::Favorites).is_empty());
}

#[tokio::test(start_paused = true)]
async fn toggling_favorite_twice_restores_order() {
    let h = harness_with(
        PrefsSnapshot {
            favorite_order: vec![2, 5],
            ..PrefsSnapshot::default()
        },
        DelayedCalculator::default(),
    )
    .await;

    h.coordinator.toggle_favorite(4);
    assert_eq!(h.coordinator.snapshot().favorite_order, vec![4, 2, 5]);
    assert!(h.coordinator.snapshot().is_favorite(4));
    h.coordinator.toggle_favorite(4);
    settle().await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.favorite_order, vec![2, 5]);
    assert!(!snapshot.is_favorite(4));
    assert_eq!(h.prefs.favorite_writes().last(), Some(&vec![2, 5]));

    h.coordinator.toggle_favorite(99);
    assert_eq!(h.coordinator.snapshot().favorite_order, vec![2, 5]);
}

#[tokio::test(start_paused = true)]
async fn favorite_burst_collapses_into_one_scheduled_upload() {
    let h = harness().await;
    for id in [1, 2, 3] {
        h.coordinator.toggle_favorite(id);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(h.client.calls().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(
        h.client.calls(),
        vec!["ensure_folder", "upload_favorites", "upload_name_plans"]
    );
    let uploaded = h.client.uploaded_favorites.lock().clone();
    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0].favorite_order, vec![3, 2, 1]);
    assert_eq!(uploaded[0].version, 1);
    assert_eq!(
        h.status().as_deref(),
        Some("Auto-sync: favorites: upload succeeded / name plans: upload succeeded")
    );
    assert_eq!(h.coordinator.snapshot().sync_state, SyncState::Idle);
}

#[tokio::test(start_paused = true)]
async fn busy_gate_rejects_manual_and_silently_skips_scheduled() {
    let h = harness().await;
    *h.client.delay.lock() = Duration::from_secs(1);

    let first = h.coordinator.manual_upload().expect("first upload starts");
    assert!(h.coordinator.is_sync_running());
    assert_eq!(
        h.coordinator.snapshot().sync_state,
        SyncState::Running(SyncTrigger::Manual)
    );

    assert!(h.coordinator.manual_upload().is_none());
    assert!(h.coordinator.manual_download().is_none());
    assert_eq!(h.status().as_deref(), Some(messages::SYNC_BUSY));

    // Armed after the manual request, fires while it still holds the gate.
    h.coordinator.toggle_favorite(1);
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    first.await.unwrap();

    assert_eq!(
        h.client.calls(),
        vec!["ensure_folder", "upload_favorites", "upload_name_plans"]
    );
    assert_eq!(
        h.status().as_deref(),
        Some("favorites: upload succeeded / name plans: upload succeeded")
    );
    assert!(!h.coordinator.is_sync_running());
    assert_eq!(h.coordinator.snapshot().sync_state, SyncState::Idle);
}

#[tokio::test(start_paused = true)]
async fn manual_upload_cancels_pending_scheduled_upload() {
    let h = harness().await;
    h.coordinator.toggle_favorite(5);
    h.coordinator.manual_upload().unwrap().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(h.client.uploaded_favorites.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn insecure_endpoint_is_rejected_before_any_request() {
    let h = harness_with(
        PrefsSnapshot {
            sync_config: SyncConfig::new("http://dav.example.com", "me", "secret"),
            ..PrefsSnapshot::default()
        },
        DelayedCalculator::default(),
    )
    .await;

    h.coordinator.manual_upload().unwrap().await.unwrap();
    assert_eq!(h.status().as_deref(), Some(messages::HTTPS_REQUIRED));

    h.coordinator.manual_download().unwrap().await.unwrap();
    assert_eq!(h.status().as_deref(), Some(messages::HTTPS_REQUIRED));

    h.coordinator.toggle_favorite(1);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        h.status(),
        Some(messages::auto_skipped(messages::HTTPS_REQUIRED))
    );

    assert!(h.client.calls().is_empty());
    assert!(!h.coordinator.is_sync_running());
}

#[tokio::test(start_paused = true)]
async fn incomplete_config_reports_only_to_manual_callers() {
    let h = harness_with(PrefsSnapshot::default(), DelayedCalculator::default()).await;

    h.coordinator.toggle_favorite(2);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.status(), None);

    h.coordinator.manual_upload().unwrap().await.unwrap();
    assert_eq!(h.status().as_deref(), Some(messages::UPLOAD_INCOMPLETE));
    h.coordinator.manual_download().unwrap().await.unwrap();
    assert_eq!(h.status().as_deref(), Some(messages::DOWNLOAD_INCOMPLETE));
    assert!(h.client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn folder_failure_aborts_upload() {
    let h = harness().await;
    *h.client.folder_error.lock() = Some(SyncError::RemoteStatus(RemoteStatus::PathConflict));

    h.coordinator.manual_upload().unwrap().await.unwrap();

    assert_eq!(h.client.calls(), vec!["ensure_folder"]);
    assert_eq!(
        h.status(),
        Some(messages::folder_failed(&SyncError::RemoteStatus(
            RemoteStatus::PathConflict
        )))
    );
    assert!(!h.coordinator.is_sync_running());
}

#[tokio::test(start_paused = true)]
async fn download_sanitizes_remote_favorites() {
    let h = harness_with(
        PrefsSnapshot {
            favorite_order: vec![1],
            sync_config: secure_config(),
            ..PrefsSnapshot::default()
        },
        DelayedCalculator::default(),
    )
    .await;
    *h.client.remote_favorites.lock() = Ok(FavoritesPayload::new(7, vec![5, 99, 2, 5, 1, 2]));

    h.coordinator.manual_download().unwrap().await.unwrap();
    settle().await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.favorite_order, vec![5, 2, 1]);
    let chars: Vec<&str> = snapshot
        .favorite_entries
        .iter()
        .map(|entry| entry.char.as_str())
        .collect();
    assert_eq!(chars, vec!["五", "二", "一"]);
    assert_eq!(h.prefs.favorite_writes().last(), Some(&vec![5, 2, 1]));
    assert_eq!(
        h.status(),
        Some(messages::summary(
            &messages::favorites_replaced(3),
            messages::NAME_PLANS_MISSING
        ))
    );
    assert_eq!(
        h.client.calls(),
        vec!["download_favorites", "download_name_plans"]
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(h.client.uploaded_favorites.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn flush_waits_for_downloaded_favorites_write() {
    let h = harness().await;
    *h.client.remote_favorites.lock() = Ok(FavoritesPayload::new(7, vec![5, 2, 1]));

    h.coordinator.manual_download().unwrap().await.unwrap();
    h.coordinator.flush().await;

    assert!(h.prefs.favorite_writes().contains(&vec![5, 2, 1]));
}

#[tokio::test(flavor = "multi_thread")]
async fn flushed_state_is_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let open_prefs = || {
        Arc::new(StoragePrefs::new(
            Arc::new(FileStorage::new(dir.path().to_path_buf())),
            Arc::new(MemorySecureStore::new()),
        ))
    };
    let prefs = open_prefs();
    prefs.write_sync_config(&secure_config()).await.unwrap();
    let client = Arc::new(FakeSyncClient::new());
    *client.remote_favorites.lock() = Ok(FavoritesPayload::new(7, vec![5, 99, 2, 1]));
    let coordinator = StateCoordinator::new(
        CoordinatorDeps {
            loader: Arc::new(FakeLoader {
                fail: AtomicBool::new(false),
            }),
            prefs,
            sync_client: client,
            calculator: Arc::new(DelayedCalculator::default()),
        },
        settings(),
    )
    .unwrap();
    coordinator.load().await;

    coordinator.toggle_favorite(3);
    coordinator.record_favorites_scroll(Some(3), 12);
    coordinator.manual_download().unwrap().await.unwrap();
    coordinator.flush().await;

    let stored = open_prefs().read_snapshot().await;
    assert_eq!(stored.favorite_order, vec![5, 2, 1]);
    assert_eq!(stored.favorites_scroll, ScrollAnchor::new(Some(3), 12));
}

#[tokio::test(start_paused = true)]
async fn download_restores_sanitized_name_plans() {
    let h = harness().await;
    *h.client.remote_favorites.lock() = Ok(FavoritesPayload::new(1, vec![3]));
    *h.client.remote_plans.lock() = Ok(Some(NamePlansPayload::new(
        1,
        "欧阳司马上官".to_string(),
        vec![NamingScheme {
            id: 4,
            given_name_mode: GivenNameMode::Single,
            slot1: "禾苗".to_string(),
            ..NamingScheme::default()
        }],
    )));

    h.coordinator.manual_download().unwrap().await.unwrap();
    settle().await;

    let naming = h.coordinator.snapshot().naming;
    assert_eq!(naming.surname, "欧阳司马");
    assert_eq!(naming.schemes[0].slot1, "禾");
    assert_eq!(naming.active_scheme_id, Some(4));
    assert!(h
        .prefs
        .writes()
        .contains(&Write::Naming(naming.clone())));
    assert!(h
        .status()
        .is_some_and(|message| message.ends_with(messages::NAME_PLANS_RESTORED)));
}

#[tokio::test(start_paused = true)]
async fn failed_download_keeps_local_favorites() {
    let h = harness_with(
        PrefsSnapshot {
            favorite_order: vec![4, 1],
            sync_config: secure_config(),
            ..PrefsSnapshot::default()
        },
        DelayedCalculator::default(),
    )
    .await;
    *h.client.remote_favorites.lock() = Err(SyncError::RemoteStatus(RemoteStatus::Auth));

    h.coordinator.manual_download().unwrap().await.unwrap();

    assert_eq!(h.coordinator.snapshot().favorite_order, vec![4, 1]);
    assert_eq!(
        h.status(),
        Some(messages::download_failed(&SyncError::RemoteStatus(
            RemoteStatus::Auth
        )))
    );
    assert_eq!(h.client.calls(), vec!["download_favorites"]);
    assert_eq!(h.coordinator.snapshot().sync_state, SyncState::Idle);
}

#[tokio::test(start_paused = true)]
async fn sync_config_requires_https_and_trims_input() {
    let h = harness_with(PrefsSnapshot::default(), DelayedCalculator::default()).await;

    let err = h
        .coordinator
        .update_sync_config("http://dav.example.com", "me", "pw")
        .unwrap_err();
    assert_eq!(err, SyncError::InsecureTransport);
    assert_eq!(h.status().as_deref(), Some(messages::HTTPS_REQUIRED_ON_SAVE));
    assert_eq!(h.coordinator.snapshot().sync_config, SyncConfig::default());

    h.coordinator
        .update_sync_config("  https://dav.example.com ", " me ", "pw")
        .unwrap();
    settle().await;

    let expected = SyncConfig::new("https://dav.example.com", "me", "pw");
    assert_eq!(h.coordinator.snapshot().sync_config, expected);
    assert_eq!(h.status().as_deref(), Some(messages::CONFIG_SAVED));
    assert_eq!(h.prefs.writes(), vec![Write::Sync(expected)]);

    h.coordinator.update_sync_config("", "", "").unwrap();
    assert_eq!(h.coordinator.snapshot().sync_config, SyncConfig::default());
}

#[tokio::test(start_paused = true)]
async fn persistence_failures_never_block_state_updates() {
    let h = harness().await;
    h.prefs.fail.store(true, Ordering::SeqCst);

    h.coordinator.toggle_favorite(3);
    h.coordinator.set_favorites_only(true);
    h.coordinator
        .toggle_value(IndexCategory::StructureRadical, "B")
        .unwrap()
        .await
        .unwrap();
    settle().await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.favorite_order, vec![3]);
    assert!(snapshot.favorites_only);
    assert_eq!(ids(&snapshot.filtered), vec![3]);
    assert!(h.prefs.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn favorites_only_view_and_entry_focus() {
    let h = harness().await;
    h.coordinator.toggle_favorite(2);
    h.coordinator.set_favorites_only(true);
    h.coordinator.set_favorites_only(true);
    settle().await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.visible_entries().len(), 1);
    assert_eq!(
        h.prefs
            .writes()
            .into_iter()
            .filter(|write| matches!(write, Write::FavoritesOnly(_)))
            .count(),
        1
    );

    h.coordinator.select_entry(2);
    assert_eq!(h.coordinator.snapshot().selected_entry, Some(2));
    h.coordinator.back_to_list();
    assert_eq!(h.coordinator.snapshot().selected_entry, None);
}

#[tokio::test(start_paused = true)]
async fn naming_edits_persist_and_trigger_scheduled_upload() {
    let h = harness().await;
    assert!(h.coordinator.update_naming_surname("李"));
    let scheme = h.coordinator.add_naming_scheme();
    assert!(h.coordinator.update_naming_slot_text(scheme, 1, "安宁"));
    assert!(!h.coordinator.fill_active_slot_from_favorite(3));

    h.coordinator.toggle_favorite(3);
    assert!(h.coordinator.fill_active_slot_from_favorite(3));
    tokio::time::sleep(Duration::from_secs(2)).await;

    let naming = h.coordinator.snapshot().naming;
    assert_eq!(naming.schemes[0].slot1, "三");
    assert_eq!(naming.schemes[0].slot2, "安");
    assert_eq!(
        h.prefs
            .writes()
            .into_iter()
            .filter_map(|write| match write {
                Write::Naming(draft) => Some(draft),
                _ => None,
            })
            .last(),
        Some(naming.clone())
    );

    let plans = h.client.uploaded_plans.lock().clone();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].surname, "李");
    assert_eq!(plans[0].schemes, naming.schemes);
}

#[tokio::test(start_paused = true)]
async fn naming_mode_switch_keeps_slots() {
    let h = harness().await;
    let scheme = h.coordinator.add_naming_scheme();
    h.coordinator.update_naming_slot_text(scheme, 0, "一");
    h.coordinator.update_naming_slot_text(scheme, 1, "二");
    assert!(h.coordinator.set_active_naming_slot(scheme, 1));

    assert!(h.coordinator.set_naming_mode(scheme, GivenNameMode::Single));
    assert_eq!(h.coordinator.snapshot().naming.active_slot_index, 0);
    assert!(h.coordinator.set_naming_mode(scheme, GivenNameMode::Double));
    assert!(!h.coordinator.set_naming_mode(scheme, GivenNameMode::Double));

    let naming = h.coordinator.snapshot().naming;
    assert_eq!(naming.schemes[0].slot2, "二");
    assert!(h.coordinator.remove_naming_scheme(scheme));
    assert!(h.coordinator.snapshot().naming.schemes.is_empty());
}
